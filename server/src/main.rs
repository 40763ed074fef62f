use std::error::Error;
use std::sync::Arc;

use warp::Filter;

use futures::future::FutureExt;
use log::{info, initialize_logger};
use regserver::auth::session::SessionStore;
use regserver::config::get_variable;
use regserver::environment::{Config, Environment};
use regserver::routes;
use regserver::store::PgStore;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let main_port: u16 = get_variable("REG_PORT")
        .parse()
        .expect("parse REG_PORT as u16");
    let ops_port: u16 = get_variable("REG_OPS_PORT")
        .parse()
        .expect("parse REG_OPS_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "ops_port" => ops_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("REG_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from REG_DB_CONNECTION_STRING");
    let store = Arc::new(PgStore::new(pool));

    let sessions = Arc::new(SessionStore::new());
    let config = Config::from_env();
    let environment = Environment::new(logger.clone(), store, sessions, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate =
        Arc::new(move || {
            let termination_sender = termination_sender.clone();

            async move {
                let termination_sender = termination_sender.clone();
                termination_sender.send(()).await.unwrap();
            }
            .boxed()
        });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate();
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let register_form_route = routes::make_register_form_route(environment.clone());
        let register_route = routes::make_register_route(environment.clone());
        let login_form_route = routes::make_login_form_route(environment.clone());
        let login_route = routes::make_login_route(environment.clone());
        let logout_route = routes::make_logout_route(environment.clone());
        let dashboard_route = routes::make_dashboard_route(environment.clone());
        let api_key_show_route = routes::make_api_key_show_route(environment.clone());
        let api_key_rotate_route = routes::make_api_key_rotate_route(environment.clone());
        let update_route = routes::make_update_route(environment.clone());
        let delete_route = routes::make_delete_route(environment.clone());
        let download_route = routes::make_download_route(environment.clone());
        let token_route = routes::make_token_route(environment.clone());
        let listing_route = routes::make_listing_route(environment.clone());

        let routes = register_form_route
            .or(register_route)
            .or(login_form_route)
            .or(login_route)
            .or(logout_route)
            .or(dashboard_route)
            .or(api_key_show_route)
            .or(api_key_rotate_route)
            .or(update_route)
            .or(delete_route)
            .or(download_route)
            .or(token_route)
            .or(listing_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let ops_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::ops::make_healthz_route(environment.clone()).or(
            routes::ops::make_termination_route(environment.clone(), terminate),
        );

        let (_, ops_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], ops_port), async {
                should_terminate.await;
            });

        ops_server
    };

    tokio::join!(ctrlc, main_server, ops_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
