use crate::errors::BackendError;
use crate::registration::Registration;

/// The fixed column set, in order, shared by every storage backend.
pub const HEADERS: [&str; 12] = [
    "Name",
    "WhatsApp",
    "Email",
    "Qualification",
    "Designation",
    "Gender",
    "College/Company",
    "Blood Donation",
    "Blood Group",
    "Webinar Interest",
    "Webinar Date",
    "Registered At",
];

const REGISTERED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serializes registrations to a CSV document with the fixed header row.
pub fn to_csv(registrations: &[Registration]) -> Result<Vec<u8>, BackendError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&HEADERS).map_err(map_csv_error)?;

    for registration in registrations {
        let fields = &registration.fields;
        let registered_at = registration
            .registered_at
            .map(|timestamp| timestamp.format(REGISTERED_AT_FORMAT))
            .unwrap_or_default();

        writer
            .write_record(&[
                fields.name.as_str(),
                fields.whatsapp.as_str(),
                fields.email.as_str(),
                fields.qualification.as_str(),
                fields.designation.as_str(),
                fields.gender.as_str(),
                fields.college.as_str(),
                fields.blood_donation.as_str(),
                fields.blood_group.as_deref().unwrap_or(""),
                fields.webinar_interest.as_str(),
                fields.webinar_date.as_deref().unwrap_or(""),
                registered_at.as_str(),
            ])
            .map_err(map_csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| map_csv_error(csv::Error::from(e.into_error())))
}

fn map_csv_error(source: csv::Error) -> BackendError {
    BackendError::Csv { source }
}
