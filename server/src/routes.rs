use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod ops;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        MissingRequiredFields(..) | MissingBloodGroup | MissingWebinarDate => {
            StatusCode::BAD_REQUEST
        }
        InvalidCredentials | Unauthorized => StatusCode::UNAUTHORIZED,
        NonExistentId(..) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use std::collections::HashMap;

    use uuid::Uuid;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, header, path as p, path::param as par, post, put, query};

    use super::{handlers, query as q};
    use crate::auth::session::SESSION_COOKIE;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let $route_variable = warp::any().map(move || environment.clone());

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_register_form_route => register_form, rt; p("register"), end(), g());
    route!(make_register_route => register, rt; p("register"), end(), post(), submission_body());
    route!(make_login_form_route => login_form, rt; p("admin"), p("login"), end(), g());
    route!(make_login_route => login, rt; p("admin"), p("login"), end(), post(), warp::body::form::<q::LoginForm>());
    route!(make_logout_route => logout, rt; p("admin"), p("logout"), end(), g(), session_cookie());
    route!(make_dashboard_route => dashboard, rt; p("admin"), p("dashboard"), end(), g(), query::<q::RangeQuery>(), session_cookie());
    route!(make_api_key_show_route => api_key_show, rt; p("admin"), p("api-key"), end(), g(), session_cookie());
    route!(make_api_key_rotate_route => api_key_rotate, rt; p("admin"), p("api-key"), end(), post(), session_cookie());
    route!(make_update_route => update, rt; p("admin"), p("registrations"), par::<Uuid>(), end(), put(), session_cookie(), warp::body::json::<HashMap<String, String>>());
    route!(make_delete_route => delete, rt; p("admin"), p("registrations"), par::<Uuid>(), end(), delete(), session_cookie());
    route!(make_download_route => download, rt; p("admin"), p("download"), end(), g(), query::<q::RangeQuery>(), session_cookie());
    route!(make_token_route => issue_token, rt; p("auth"), p("token"), end(), post(), warp::body::json::<q::TokenRequest>());
    route!(make_listing_route => listing, rt; p("api"), p("registrations"), end(), g(), query::<q::ListingQuery>(), header::optional::<String>("authorization"), header::optional::<String>("x-api-key"));

    fn session_cookie(
    ) -> impl Filter<Extract = (Option<String>,), Error = std::convert::Infallible> + Copy {
        warp::cookie::optional::<String>(SESSION_COOKIE)
    }

    /// Registrations arrive either as JSON or as a classic form post.
    fn submission_body(
    ) -> impl Filter<Extract = (handlers::SubmissionBody,), Error = warp::reject::Rejection> + Clone
    {
        warp::body::json::<HashMap<String, String>>()
            .map(handlers::SubmissionBody::Json)
            .or(warp::body::form::<HashMap<String, String>>().map(handlers::SubmissionBody::Form))
            .unify()
    }
}
