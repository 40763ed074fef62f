use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use uuid::Uuid;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::aggregation::aggregate;
use crate::auth::{apikey, credentials, session::SESSION_COOKIE, token};
use crate::dates::DateRange;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::export;
use crate::registration::Registration;
use crate::routes::{
    query::{ListingQuery, LoginForm, RangeQuery, TokenRequest},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::validation::{validate, REQUIRED_FIELDS};

const SERVER_TIMING_HEADER: &str = "server-timing";
const LOGIN_PATH: &str = "/admin/login";
const DASHBOARD_PATH: &str = "/admin/dashboard";
const REGISTER_PATH: &str = "/register";

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

/// A submitted registration, tagged with how it arrived so the reply
/// can match: JSON clients get a JSON body, form posts get a redirect.
pub enum SubmissionBody {
    Json(HashMap<String, String>),
    Form(HashMap<String, String>),
}

pub async fn register_form(_environment: Environment) -> RouteResult {
    timed! {
        let required: Vec<&str> = REQUIRED_FIELDS.iter().map(|(_, label)| *label).collect();
        let optional = vec!["Blood Donation", "Blood Group", "Webinar Interest", "Webinar Date"];

        json(&SuccessResponse::Form { required, optional })
    }
}

pub async fn register(environment: Environment, submission: SubmissionBody) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::Register, e);

        let (form, wants_json) = match submission {
            SubmissionBody::Json(form) => (form, true),
            SubmissionBody::Form(form) => (form, false),
        };

        debug!(environment.logger, "Validating submission...");
        let fields = validate(&form).map_err(error_handler)?;

        debug!(environment.logger, "Appending registration...");
        let registration = environment
            .store
            .append(fields)
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Appended registration"; "id" => %registration.id);

        let reply: Box<dyn Reply> = if wants_json {
            Box::new(with_status(
                json(&SuccessResponse::Registered { id: registration.id }),
                StatusCode::CREATED,
            ))
        } else {
            redirect_to(REGISTER_PATH)
        };

        reply
    }
}

pub async fn login_form(_environment: Environment) -> RouteResult {
    timed! {
        json(&SuccessResponse::Form {
            required: vec!["Email", "Password"],
            optional: vec![],
        })
    }
}

pub async fn login(environment: Environment, form: LoginForm) -> RouteResult {
    let authenticated = form.email == environment.config.admin_email
        && credentials::verify_password(&form.password, &environment.config.admin_password_hash);

    // the same error whichever part of the credential was wrong
    if !authenticated {
        debug!(environment.logger, "Rejected admin login");
        return Err(Rejection::new(Context::Login, BackendError::InvalidCredentials).into());
    }

    timed! {
        let session = environment.sessions.open();
        debug!(environment.logger, "Admin logged in");

        Box::new(with_header(
            redirect_to(DASHBOARD_PATH),
            "set-cookie",
            format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, session),
        )) as Box<dyn Reply>
    }
}

pub async fn logout(environment: Environment, session: Option<String>) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    if let Some(id) = &session {
        environment.sessions.close(id);
    }

    debug!(environment.logger, "Admin logged out");

    timed! {
        Box::new(with_header(
            redirect_to(LOGIN_PATH),
            "set-cookie",
            format!("{}=; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE),
        )) as Box<dyn Reply>
    }
}

pub async fn dashboard(
    environment: Environment,
    query: RangeQuery,
    session: Option<String>,
) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::Dashboard, e);

        let registrations =
            list_registrations(&environment, query.start.as_deref(), query.end.as_deref())
                .await
                .map_err(error_handler)?;

        let stats = aggregate(&registrations);

        json(&SuccessResponse::Dashboard(stats))
    }
}

pub async fn api_key_show(environment: Environment, session: Option<String>) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::ApiKey, e);

        let api_key = environment
            .store
            .retrieve_api_key()
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::ApiKey { api_key })
    }
}

pub async fn api_key_rotate(environment: Environment, session: Option<String>) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::ApiKey, e);

        let key = apikey::generate();
        environment
            .store
            .replace_api_key(key.clone())
            .await
            .map_err(error_handler)?;

        debug!(environment.logger, "Replaced API key");

        with_status(
            json(&SuccessResponse::ApiKey { api_key: Some(key) }),
            StatusCode::CREATED,
        )
    }
}

pub async fn issue_token(environment: Environment, request: TokenRequest) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::Token, e);

        let subject = token_subject(&environment, &request)
            .await
            .map_err(error_handler)?;

        let token =
            token::issue(&environment.config.token_secret, subject).map_err(error_handler)?;

        debug!(environment.logger, "Issued bearer token"; "subject" => subject);

        json(&SuccessResponse::Token {
            token,
            expires_in_minutes: token::TOKEN_TTL_MINUTES,
        })
    }
}

pub async fn download(
    environment: Environment,
    query: RangeQuery,
    session: Option<String>,
) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::Download, e);

        let registrations =
            list_registrations(&environment, query.start.as_deref(), query.end.as_deref())
                .await
                .map_err(error_handler)?;

        let document = export::to_csv(&registrations).map_err(error_handler)?;

        Box::new(with_header(
            with_header(
                warp::http::Response::new(document),
                "content-type",
                "text/csv; charset=utf-8",
            ),
            "content-disposition",
            "attachment; filename=\"registrations.csv\"",
        )) as Box<dyn Reply>
    }
}

pub async fn listing(
    environment: Environment,
    query: ListingQuery,
    authorization: Option<String>,
    api_key_header: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::Listing, e);

        authorize_listing(
            &environment,
            &query,
            authorization.as_deref(),
            api_key_header.as_deref(),
        )
        .await
        .map_err(error_handler)?;

        let registrations =
            list_registrations(&environment, query.start.as_deref(), query.end.as_deref())
                .await
                .map_err(error_handler)?;

        json(&SuccessResponse::Listing {
            count: registrations.len(),
            registrations,
        })
    }
}

pub async fn update(
    environment: Environment,
    id: Uuid,
    session: Option<String>,
    form: HashMap<String, String>,
) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        let fields = validate(&form)
            .map_err(|e| Rejection::new(Context::Update { id: id.to_string() }, e))?;

        environment
            .store
            .update(&id, fields)
            .await
            .map_err(|e| Rejection::new(Context::Update { id: id.to_string() }, e))?;

        debug!(environment.logger, "Updated registration"; "id" => %id);

        StatusCode::NO_CONTENT
    }
}

pub async fn delete(environment: Environment, id: Uuid, session: Option<String>) -> RouteResult {
    if let Some(redirect) = require_session(&environment, session.as_deref()) {
        return Ok(redirect);
    }

    timed! {
        environment
            .store
            .delete(&id)
            .await
            .map_err(|e| Rejection::new(Context::Delete { id: id.to_string() }, e))?;

        debug!(environment.logger, "Deleted registration"; "id" => %id);

        StatusCode::NO_CONTENT
    }
}

/// The session gate: admin-only operations redirect to the login page
/// instead of serving the resource when no active session is presented.
fn require_session(environment: &Environment, session: Option<&str>) -> Option<Box<dyn Reply>> {
    match session {
        Some(id) if environment.sessions.is_active(id) => None,
        _ => {
            debug!(environment.logger, "Redirecting unauthenticated admin request");
            Some(redirect_to(LOGIN_PATH))
        }
    }
}

fn redirect_to(location: &'static str) -> Box<dyn Reply> {
    Box::new(with_header(
        with_status(warp::reply(), StatusCode::FOUND),
        "location",
        location,
    ))
}

async fn list_registrations(
    environment: &Environment,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<Registration>, BackendError> {
    let range = DateRange::from_params(start, end);

    if range.is_unbounded() {
        environment.store.list_all().await
    } else {
        environment.store.list_in_range(range).await
    }
}

/// Picks the token subject from the request body: the API key if one
/// was presented, the admin credentials otherwise.
async fn token_subject(
    environment: &Environment,
    request: &TokenRequest,
) -> Result<&'static str, BackendError> {
    if let Some(presented) = request.api_key.as_deref() {
        let stored = environment.store.retrieve_api_key().await?;

        return if stored.as_deref() == Some(presented) {
            Ok(token::SUBJECT_API_KEY)
        } else {
            Err(BackendError::InvalidCredentials)
        };
    }

    if let (Some(email), Some(password)) = (&request.email, &request.password) {
        let matches = email == &environment.config.admin_email
            && credentials::verify_password(password, &environment.config.admin_password_hash);

        return if matches {
            Ok(token::SUBJECT_ADMIN)
        } else {
            Err(BackendError::InvalidCredentials)
        };
    }

    Err(BackendError::InvalidCredentials)
}

/// Bearer-first: the raw API key is consulted only when no bearer token
/// was presented at all.
async fn authorize_listing(
    environment: &Environment,
    query: &ListingQuery,
    authorization: Option<&str>,
    api_key_header: Option<&str>,
) -> Result<(), BackendError> {
    match authorization {
        Some(header) => {
            let bearer = header
                .strip_prefix("Bearer ")
                .ok_or(BackendError::Unauthorized)?;

            token::verify(&environment.config.token_secret, bearer)?;

            Ok(())
        }
        None => {
            let presented = api_key_header
                .or_else(|| query.api_key.as_deref())
                .ok_or(BackendError::Unauthorized)?;

            let stored = environment.store.retrieve_api_key().await?;

            if stored.as_deref() == Some(presented) {
                Ok(())
            } else {
                Err(BackendError::Unauthorized)
            }
        }
    }
}

fn format_server_timing(elapsed: Duration) -> String {
    format!("handler;dur={}", elapsed.as_secs_f64() * 1000.0)
}
