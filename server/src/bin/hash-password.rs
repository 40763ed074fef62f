use std::error::Error;

use structopt::StructOpt;

use regserver::auth::credentials;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "hash-password",
    about = "Hash an admin password for use as REG_ADMIN_PASSWORD_HASH"
)]
struct Opt {
    /// The password to hash
    password: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();

    let hash = credentials::hash_password(&opt.password).expect("hash password");

    println!("{}", hash);

    Ok(())
}
