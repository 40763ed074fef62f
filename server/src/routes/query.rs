use serde::Deserialize;

/// The optional calendar-date filter accepted by the dashboard and
/// download endpoints. Malformed values are ignored, not errored.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// The body of a token-issuance request: either the API key or the
/// admin credentials.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub api_key: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// The query parameters of the read-only listing. The API key may
/// arrive here instead of in the `X-API-Key` header.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub api_key: Option<String>,
}
