use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The validated fields of one registration submission.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RegistrationFields {
    /// The name provided.
    pub name: String,

    /// The WhatsApp contact number provided.
    pub whatsapp: String,

    /// The email address provided.
    pub email: String,

    /// The qualification provided.
    pub qualification: String,

    /// The designation provided.
    pub designation: String,

    /// The gender provided.
    pub gender: String,

    /// The college or company provided.
    pub college: String,

    /// Whether blood donation was opted into ("Yes"/"No").
    pub blood_donation: String,

    /// The blood group. Required iff `blood_donation` is "Yes".
    #[serde(default)]
    pub blood_group: Option<String>,

    /// Whether webinar interest was expressed ("Yes"/"No").
    pub webinar_interest: String,

    /// The preferred webinar date. Required iff `webinar_interest` is "Yes".
    #[serde(default)]
    pub webinar_date: Option<String>,
}

/// A single persisted registration: the validated fields plus the
/// server-assigned envelope. The timestamp is never client-supplied;
/// it may be absent for records carried over from earlier backends.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Registration {
    /// The ID of the registration.
    pub id: Uuid,

    /// The user-submitted fields.
    #[serde(flatten)]
    pub fields: RegistrationFields,

    /// The date and time it was appended, as a unix timestamp.
    #[serde(with = "optional_timestamp")]
    pub registered_at: Option<OffsetDateTime>,
}

/// Unix-timestamp serde for an optional `OffsetDateTime`. `time` 0.2
/// ships `time::serde::timestamp` only for the non-optional case.
pub(crate) mod optional_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(timestamp) => serializer.serialize_some(&timestamp.unix_timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let seconds: Option<i64> = Option::deserialize(deserializer)?;

        Ok(seconds.map(OffsetDateTime::from_unix_timestamp))
    }
}
