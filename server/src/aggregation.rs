use serde::Serialize;

use crate::registration::Registration;

/// One value of a categorical field and how often it occurred.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldCount {
    pub value: String,
    pub count: u64,
}

/// Aggregate statistics over a snapshot of registrations.
#[derive(Clone, Debug, Serialize)]
pub struct DashboardStats {
    pub total: u64,
    pub qualifications: Vec<FieldCount>,
    pub designations: Vec<FieldCount>,
    pub genders: Vec<FieldCount>,
    pub colleges: Vec<FieldCount>,
    pub webinar_interested: u64,
    pub blood_donors: u64,
}

/// Computes the dashboard statistics. Pure; the input is not modified.
pub fn aggregate(registrations: &[Registration]) -> DashboardStats {
    DashboardStats {
        total: registrations.len() as u64,
        qualifications: count_by(registrations, |r| &r.fields.qualification),
        designations: count_by(registrations, |r| &r.fields.designation),
        genders: count_by(registrations, |r| &r.fields.gender),
        colleges: count_by(registrations, |r| &r.fields.college),
        webinar_interested: count_yes(registrations, |r| &r.fields.webinar_interest),
        blood_donors: count_yes(registrations, |r| &r.fields.blood_donation),
    }
}

/// Counts the occurrences of each value of one field. Empty values are
/// grouped under "Unknown". Sorted by count descending; the order among
/// equal counts follows first appearance and is implementation-defined.
pub fn count_by<'a>(
    registrations: &'a [Registration],
    field: impl Fn(&'a Registration) -> &'a str,
) -> Vec<FieldCount> {
    let mut counts: Vec<FieldCount> = Vec::new();

    for registration in registrations {
        let value = field(registration);
        let value = if value.is_empty() { "Unknown" } else { value };

        match counts.iter_mut().find(|entry| entry.value == value) {
            Some(entry) => entry.count += 1,
            None => counts.push(FieldCount {
                value: value.to_owned(),
                count: 1,
            }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));

    counts
}

fn count_yes<'a>(
    registrations: &'a [Registration],
    field: impl Fn(&'a Registration) -> &'a str,
) -> u64 {
    registrations
        .iter()
        .filter(|registration| is_yes(field(registration)))
        .count() as u64
}

/// Flag comparison trims surrounding whitespace and ignores case.
fn is_yes(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}
