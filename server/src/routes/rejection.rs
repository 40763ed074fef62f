use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

/// A failed request: which operation was running plus what went wrong.
/// Recovered once at the top of the filter chain by `format_rejection`.
#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        let missing = match &self.error {
            BackendError::MissingRequiredFields(labels) => Some(labels.clone()),
            _ => None,
        };

        FlattenedRejection {
            error: format!("{}", self.error),
            missing,
        }
    }
}

impl reject::Reject for Rejection {}

/// The JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    pub(crate) error: String,

    /// The missing field labels, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) missing: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    Register,
    Login,
    Dashboard,
    ApiKey,
    Token,
    Download,
    Listing,
    Update { id: String },
    Delete { id: String },
}
