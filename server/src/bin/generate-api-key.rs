use std::error::Error;

use dotenv::dotenv;
use log::{info, initialize_logger};
use structopt::StructOpt;

use regserver::auth::apikey;
use regserver::config::get_variable;
use regserver::store::{PgStore, Store};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "generate-api-key",
    about = "Generate a fresh API key and store it, replacing any existing one"
)]
struct Opt {
    /// Print the new key to standard output instead of only logging it
    #[structopt(long)]
    show: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let opt = Opt::from_args();

    let logger = initialize_logger();

    let connection_string = get_variable("REG_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from REG_DB_CONNECTION_STRING");
    let store = PgStore::new(pool);

    info!(logger, "Generating API key...");

    let key = apikey::generate();
    store
        .replace_api_key(key.clone())
        .await
        .expect("store API key");

    info!(logger, "Stored new API key; any previous key is now invalid");

    if opt.show {
        println!("{}", key);
    }

    Ok(())
}
