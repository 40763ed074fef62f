use serde::Serialize;
use uuid::Uuid;

use crate::aggregation::DashboardStats;
use crate::registration::Registration;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Registered {
        id: Uuid,
    },
    Form {
        required: Vec<&'a str>,
        optional: Vec<&'a str>,
    },
    Dashboard(DashboardStats),
    ApiKey {
        api_key: Option<String>,
    },
    Token {
        token: String,
        expires_in_minutes: i64,
    },
    Listing {
        count: usize,
        registrations: Vec<Registration>,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
}
