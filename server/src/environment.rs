use std::sync::Arc;

use log::Logger;

use crate::auth::session::SessionStore;
use crate::store::Store;

pub type SharedStore = dyn Store + Send + Sync;

/// Everything a route needs, cloned into each request: the store is an
/// injected trait object so routes can be exercised against a fixture
/// store.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub store: Arc<SharedStore>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        store: Arc<SharedStore>,
        sessions: Arc<SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            store,
            sessions,
            config,
        }
    }
}

/// The fixed administrator identity and the token-signing secret.
/// Process-wide configuration, not editable at runtime.
#[derive(Clone)]
pub struct Config {
    pub admin_email: String,

    /// An argon2 PHC hash, not the plaintext password. Produced by the
    /// `hash-password` helper.
    pub admin_password_hash: String,

    pub token_secret: Vec<u8>,
}

impl Config {
    pub fn from_env() -> Self {
        use crate::config::get_variable;

        Config {
            admin_email: get_variable("REG_ADMIN_EMAIL"),
            admin_password_hash: get_variable("REG_ADMIN_PASSWORD_HASH"),
            token_secret: get_variable("REG_TOKEN_SECRET").into_bytes(),
        }
    }
}
