use thiserror::Error;
use uuid::Uuid;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// One or more required fields were blank. Carries every missing
    /// field's human label, in the declared field order.
    #[error("please fill all required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    /// Blood donation was opted into without naming a blood group.
    #[error("please select your blood group")]
    MissingBloodGroup,

    /// Webinar interest was expressed without picking a date.
    #[error("please pick a preferred webinar date")]
    MissingWebinarDate,

    /// Bad login or bad token-issuance credentials. Deliberately does
    /// not say which part of the credential was wrong.
    #[error("invalid_credentials")]
    InvalidCredentials,

    /// Bad or absent API key or bearer token. Deliberately carries no
    /// detail about why verification failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Represents an operation against a registration that does not exist.
    #[error("no registration with ID {0}")]
    NonExistentId(Uuid),

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a failure while serializing the export.
    #[error("CSV export error")]
    Csv { source: csv::Error },

    /// Represents a failure while signing a bearer token.
    #[error("token issuance error")]
    TokenIssuance { source: jsonwebtoken::errors::Error },
}
