use std::collections::HashMap;

use crate::errors::BackendError;
use crate::registration::RegistrationFields;

/// The required fields, keyed by form name, in the order their labels
/// are reported when missing.
pub const REQUIRED_FIELDS: [(&str, &str); 7] = [
    ("name", "Name"),
    ("whatsapp", "WhatsApp"),
    ("email", "Email"),
    ("qualification", "Qualification"),
    ("designation", "Designation"),
    ("gender", "Gender"),
    ("college", "College/Company"),
];

/// Checks a submitted field map and produces the validated fields.
///
/// The required-field check accumulates every missing label before
/// failing. The conditional checks run only once the required check
/// passes, and the first conditional failure wins, blood donation
/// before webinar interest. Pure; the map is not modified.
pub fn validate(form: &HashMap<String, String>) -> Result<RegistrationFields, BackendError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(key, _)| trimmed(form, key).is_empty())
        .map(|(_, label)| (*label).to_owned())
        .collect();

    if !missing.is_empty() {
        return Err(BackendError::MissingRequiredFields(missing));
    }

    let blood_donation = flag(form, "blood_donation");
    let blood_group = non_empty(trimmed(form, "blood_group"));

    if blood_donation == "Yes" && blood_group.is_none() {
        return Err(BackendError::MissingBloodGroup);
    }

    let webinar_interest = flag(form, "webinar_interest");
    let webinar_date = non_empty(trimmed(form, "webinar_date"));

    if webinar_interest == "Yes" && webinar_date.is_none() {
        return Err(BackendError::MissingWebinarDate);
    }

    Ok(RegistrationFields {
        name: trimmed(form, "name"),
        whatsapp: trimmed(form, "whatsapp"),
        email: trimmed(form, "email"),
        qualification: trimmed(form, "qualification"),
        designation: trimmed(form, "designation"),
        gender: trimmed(form, "gender"),
        college: trimmed(form, "college"),
        blood_donation,
        blood_group,
        webinar_interest,
        webinar_date,
    })
}

fn trimmed(form: &HashMap<String, String>, key: &str) -> String {
    form.get(key).map(|value| value.trim().to_owned()).unwrap_or_default()
}

/// An absent flag reads as "No".
fn flag(form: &HashMap<String, String>, key: &str) -> String {
    non_empty(trimmed(form, key)).unwrap_or_else(|| "No".to_owned())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
