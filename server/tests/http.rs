use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, OffsetDateTime};
use uuid::Uuid;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use log::initialize_logger;
use regserver::auth::{credentials, session::SessionStore};
use regserver::environment::{Config, Environment};
use regserver::registration::{Registration, RegistrationFields};
use regserver::routes;
use regserver::store::memory::MemoryStore;
use regserver::store::Store;

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery staple";
const TOKEN_SECRET: &[u8] = b"integration-test-secret";

type Route = BoxedFilter<(Box<dyn Reply>,)>;

fn environment(store: Arc<MemoryStore>) -> Environment {
    let config = Config {
        admin_email: ADMIN_EMAIL.to_owned(),
        admin_password_hash: credentials::hash_password(ADMIN_PASSWORD)
            .expect("hash test password"),
        token_secret: TOKEN_SECRET.to_vec(),
    };

    Environment::new(
        Arc::new(initialize_logger()),
        store,
        Arc::new(SessionStore::new()),
        config,
    )
}

/// Applies the same rejection handling the server installs, so error
/// responses carry their JSON bodies here too.
fn recovered(environment: &Environment, route: Route) -> Route {
    let logger = environment.logger.clone();

    route
        .recover(move |r| routes::format_rejection(logger.clone(), r))
        .map(|reply| Box::new(reply) as Box<dyn Reply>)
        .boxed()
}

fn submission(name: &str) -> HashMap<String, String> {
    let mut form = HashMap::new();

    for (key, value) in [
        ("name", name),
        ("whatsapp", "9999999999"),
        ("email", "testuser@example.com"),
        ("qualification", "BSc"),
        ("designation", "Engineer"),
        ("gender", "Male"),
        ("college", "Test College"),
    ] {
        form.insert(key.to_owned(), value.to_owned());
    }

    form
}

fn staged(name: &str, registered_at: Option<OffsetDateTime>) -> Registration {
    Registration {
        id: Uuid::new_v4(),
        fields: RegistrationFields {
            name: name.to_owned(),
            whatsapp: "9999999999".to_owned(),
            email: "testuser@example.com".to_owned(),
            qualification: "BSc".to_owned(),
            designation: "Engineer".to_owned(),
            gender: "Male".to_owned(),
            college: "Test College".to_owned(),
            blood_donation: "No".to_owned(),
            blood_group: None,
            webinar_interest: "No".to_owned(),
            webinar_date: None,
        },
        registered_at,
    }
}

fn day(date: &str) -> OffsetDateTime {
    Date::parse(date, "%Y-%m-%d")
        .expect("parse test date")
        .midnight()
        .assume_utc()
}

fn body_json<T: AsRef<[u8]>>(response: &warp::http::Response<T>) -> serde_json::Value {
    serde_json::from_slice(response.body().as_ref()).expect("parse response body as JSON")
}

async fn log_in(environment: &Environment) -> String {
    let login = recovered(environment, routes::make_login_route(environment.clone()));

    let response = warp::test::request()
        .method("POST")
        .path("/admin/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(format!(
            "email={}&password={}",
            "admin%40example.com", "correct%20horse%20battery%20staple"
        ))
        .reply(&login)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").expect("location header"),
        "/admin/dashboard"
    );

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("set-cookie header")
        .to_str()
        .expect("cookie is ASCII");
    let session = cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .trim()
        .to_owned();

    assert!(session.starts_with("admin_session="));

    session
}

#[tokio::test]
async fn json_registration_returns_the_new_id() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());
    let register = recovered(&environment, routes::make_register_route(environment.clone()));

    let response = warp::test::request()
        .method("POST")
        .path("/register")
        .json(&submission("Test User"))
        .reply(&register)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(&response);
    let id = body["id"].as_str().expect("id in response");
    Uuid::parse_str(id).expect("id is a UUID");

    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn form_registration_redirects_back_to_the_form() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());
    let register = recovered(&environment, routes::make_register_route(environment.clone()));

    let response = warp::test::request()
        .method("POST")
        .path("/register")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(
            "name=Test+User&whatsapp=9999999999&email=testuser%40example.com\
             &qualification=BSc&designation=Engineer&gender=Male&college=Test+College",
        )
        .reply(&register)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").expect("location header"),
        "/register"
    );
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn missing_fields_are_reported_together_in_form_order() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());
    let register = recovered(&environment, routes::make_register_route(environment.clone()));

    let mut form = HashMap::new();
    form.insert("email".to_owned(), "testuser@example.com".to_owned());

    let response = warp::test::request()
        .method("POST")
        .path("/register")
        .json(&form)
        .reply(&register)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(&response);
    let missing: Vec<&str> = body["missing"]
        .as_array()
        .expect("missing labels")
        .iter()
        .map(|label| label.as_str().expect("label is a string"))
        .collect();

    assert_eq!(
        missing,
        vec![
            "Name",
            "WhatsApp",
            "Qualification",
            "Designation",
            "Gender",
            "College/Company"
        ]
    );
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .starts_with("please fill all required fields:"));
    assert!(store.is_empty());
}

#[tokio::test]
async fn donation_without_a_blood_group_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());
    let register = recovered(&environment, routes::make_register_route(environment.clone()));

    let mut form = submission("Test User");
    form.insert("blood_donation".to_owned(), "Yes".to_owned());

    let response = warp::test::request()
        .method("POST")
        .path("/register")
        .json(&form)
        .reply(&register)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(&response)["error"],
        "please select your blood group"
    );
}

#[tokio::test]
async fn the_dashboard_requires_an_active_session() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store);
    let dashboard = recovered(
        &environment,
        routes::make_dashboard_route(environment.clone()),
    );

    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard")
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").expect("location header"),
        "/admin/login"
    );

    // a made-up session id is as good as none
    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard")
        .header("cookie", "admin_session=made-up")
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn bad_credentials_are_rejected_without_detail() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store);
    let login = recovered(&environment, routes::make_login_route(environment.clone()));

    let response = warp::test::request()
        .method("POST")
        .path("/admin/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body("email=admin%40example.com&password=wrong")
        .reply(&login)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(&response)["error"], "invalid_credentials");
}

#[tokio::test]
async fn login_dashboard_logout_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    let register = recovered(&environment, routes::make_register_route(environment.clone()));
    for name in ["First", "Second"] {
        let response = warp::test::request()
            .method("POST")
            .path("/register")
            .json(&submission(name))
            .reply(&register)
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let session = log_in(&environment).await;

    let dashboard = recovered(
        &environment,
        routes::make_dashboard_route(environment.clone()),
    );
    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard")
        .header("cookie", &session)
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(&response);
    assert_eq!(body["total"], 2);
    assert_eq!(body["qualifications"][0]["value"], "BSc");
    assert_eq!(body["qualifications"][0]["count"], 2);
    assert_eq!(body["webinar_interested"], 0);
    assert_eq!(body["blood_donors"], 0);

    let logout = recovered(&environment, routes::make_logout_route(environment.clone()));
    let response = warp::test::request()
        .method("GET")
        .path("/admin/logout")
        .header("cookie", &session)
        .reply(&logout)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").expect("location header"),
        "/admin/login"
    );

    // the session is gone, so the dashboard redirects again
    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard")
        .header("cookie", &session)
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn dashboard_date_filter_ignores_malformed_bounds() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    store.insert_raw(staged("January", Some(day("2026-01-15"))));
    store.insert_raw(staged("February", Some(day("2026-02-15"))));
    store.insert_raw(staged("Unstamped", None));

    let session = log_in(&environment).await;
    let dashboard = recovered(
        &environment,
        routes::make_dashboard_route(environment.clone()),
    );

    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard?start=2026-01-01&end=2026-01-31")
        .header("cookie", &session)
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["total"], 1);

    // malformed bounds fall away entirely, leaving the unfiltered view,
    // which also includes records without a timestamp
    let response = warp::test::request()
        .method("GET")
        .path("/admin/dashboard?start=not-a-date&end=2026-13-45")
        .header("cookie", &session)
        .reply(&dashboard)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["total"], 3);
}

#[tokio::test]
async fn rotating_the_api_key_invalidates_the_previous_one() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    let session = log_in(&environment).await;

    let rotate = recovered(
        &environment,
        routes::make_api_key_rotate_route(environment.clone()),
    );
    let response = warp::test::request()
        .method("POST")
        .path("/admin/api-key")
        .header("cookie", &session)
        .reply(&rotate)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let first_key = body_json(&response)["api_key"]
        .as_str()
        .expect("api key")
        .to_owned();

    let listing = recovered(&environment, routes::make_listing_route(environment.clone()));
    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations")
        .header("x-api-key", &first_key)
        .reply(&listing)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["count"], store.len());

    let response = warp::test::request()
        .method("POST")
        .path("/admin/api-key")
        .header("cookie", &session)
        .reply(&rotate)
        .await;
    let second_key = body_json(&response)["api_key"]
        .as_str()
        .expect("api key")
        .to_owned();
    assert_ne!(first_key, second_key);

    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations")
        .header("x-api-key", &first_key)
        .reply(&listing)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(&response)["error"], "unauthorized");

    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations")
        .header("x-api-key", &second_key)
        .reply(&listing)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tokens_are_issued_for_the_api_key_or_the_admin_credentials() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    store
        .replace_api_key("the-api-key".to_owned())
        .await
        .expect("store API key");

    let token_route = recovered(&environment, routes::make_token_route(environment.clone()));

    let mut request = HashMap::new();
    request.insert("api_key", "the-api-key");
    let response = warp::test::request()
        .method("POST")
        .path("/auth/token")
        .json(&request)
        .reply(&token_route)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(&response);
    assert_eq!(body["expires_in_minutes"], 30);
    let token = body["token"].as_str().expect("token").to_owned();

    let listing = recovered(&environment, routes::make_listing_route(environment.clone()));
    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations")
        .header("authorization", format!("Bearer {}", token))
        .reply(&listing)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["count"], 0);

    let mut request = HashMap::new();
    request.insert("api_key", "the-wrong-key");
    let response = warp::test::request()
        .method("POST")
        .path("/auth/token")
        .json(&request)
        .reply(&token_route)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(&response)["error"], "invalid_credentials");

    let mut request = HashMap::new();
    request.insert("email", ADMIN_EMAIL);
    request.insert("password", ADMIN_PASSWORD);
    let response = warp::test::request()
        .method("POST")
        .path("/auth/token")
        .json(&request)
        .reply(&token_route)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut request = HashMap::new();
    request.insert("email", ADMIN_EMAIL);
    request.insert("password", "wrong");
    let response = warp::test::request()
        .method("POST")
        .path("/auth/token")
        .json(&request)
        .reply(&token_route)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn a_presented_bearer_token_is_never_rescued_by_the_api_key() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    store
        .replace_api_key("the-api-key".to_owned())
        .await
        .expect("store API key");

    let listing = recovered(&environment, routes::make_listing_route(environment.clone()));

    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations?api_key=the-api-key")
        .header("authorization", "Bearer not.a.token")
        .reply(&listing)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(&response)["error"], "unauthorized");
}

#[tokio::test]
async fn the_listing_accepts_the_api_key_as_a_query_parameter() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    store
        .replace_api_key("the-api-key".to_owned())
        .await
        .expect("store API key");
    store.insert_raw(staged("January", Some(day("2026-01-15"))));
    store.insert_raw(staged("February", Some(day("2026-02-15"))));

    let listing = recovered(&environment, routes::make_listing_route(environment.clone()));

    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations?api_key=the-api-key&start=2026-01-01&end=2026-01-31")
        .reply(&listing)
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(&response);
    assert_eq!(body["count"], 1);
    assert_eq!(body["registrations"][0]["name"], "January");
}

#[tokio::test]
async fn the_listing_rejects_anonymous_requests() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store);

    let listing = recovered(&environment, routes::make_listing_route(environment.clone()));

    let response = warp::test::request()
        .method("GET")
        .path("/api/registrations")
        .reply(&listing)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn the_download_is_a_csv_attachment() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    store.insert_raw(staged("Test User", Some(day("2026-01-15"))));

    let session = log_in(&environment).await;
    let download = recovered(
        &environment,
        routes::make_download_route(environment.clone()),
    );

    let response = warp::test::request()
        .method("GET")
        .path("/admin/download")
        .header("cookie", &session)
        .reply(&download)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-disposition")
            .expect("content-disposition header"),
        "attachment; filename=\"registrations.csv\""
    );

    let body = String::from_utf8(response.body().to_vec()).expect("CSV is UTF-8");
    let mut lines = body.lines();
    assert!(lines
        .next()
        .expect("header row")
        .starts_with("Name,WhatsApp,Email,"));
    assert!(lines.next().expect("data row").starts_with("Test User,"));
}

#[tokio::test]
async fn updating_and_deleting_require_a_session_and_an_existing_id() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store.clone());

    let registration = store
        .append(staged("Test User", None).fields)
        .await
        .expect("append");

    let update = recovered(&environment, routes::make_update_route(environment.clone()));
    let delete = recovered(&environment, routes::make_delete_route(environment.clone()));

    // no session: redirected, nothing changed
    let response = warp::test::request()
        .method("PUT")
        .path(&format!("/admin/registrations/{}", registration.id))
        .json(&submission("Renamed"))
        .reply(&update)
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let session = log_in(&environment).await;

    let response = warp::test::request()
        .method("PUT")
        .path(&format!("/admin/registrations/{}", registration.id))
        .header("cookie", &session)
        .json(&submission("Renamed"))
        .reply(&update)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let all = store.list_all().await.expect("list all");
    assert_eq!(all[0].fields.name, "Renamed");

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/admin/registrations/{}", Uuid::new_v4()))
        .header("cookie", &session)
        .reply(&delete)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = warp::test::request()
        .method("DELETE")
        .path(&format!("/admin/registrations/{}", registration.id))
        .header("cookie", &session)
        .reply(&delete)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.is_empty());
}

#[tokio::test]
async fn the_form_descriptors_list_the_expected_fields() {
    let store = Arc::new(MemoryStore::new());
    let environment = environment(store);

    let register_form = recovered(
        &environment,
        routes::make_register_form_route(environment.clone()),
    );
    let response = warp::test::request()
        .method("GET")
        .path("/register")
        .reply(&register_form)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(&response);
    assert_eq!(body["required"][0], "Name");
    assert_eq!(body["required"][6], "College/Company");

    let login_form = recovered(
        &environment,
        routes::make_login_form_route(environment.clone()),
    );
    let response = warp::test::request()
        .method("GET")
        .path("/admin/login")
        .reply(&login_form)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["required"][0], "Email");
}
