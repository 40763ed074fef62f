//! The access gate: admin sessions, the shared API key, and short-lived
//! bearer tokens. The three schemes are independent and are composed at
//! the route boundary.

use rand::rngs::OsRng;
use rand::RngCore;

/// Returns 32 bytes from the OS RNG, hex-encoded (256 bits of entropy).
fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);

    hex::encode(bytes)
}

pub mod session {
    use std::collections::HashSet;
    use std::sync::RwLock;

    /// The cookie carrying the admin session id.
    pub const SESSION_COOKIE: &str = "admin_session";

    /// The set of active admin session ids. An entry lives from login
    /// until logout or process restart; there is no explicit expiry.
    #[derive(Default)]
    pub struct SessionStore {
        active: RwLock<HashSet<String>>,
    }

    impl SessionStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Opens a session and returns its id.
        pub fn open(&self) -> String {
            let id = super::random_secret();
            self.active.write().unwrap().insert(id.clone());

            id
        }

        pub fn is_active(&self, id: &str) -> bool {
            self.active.read().unwrap().contains(id)
        }

        pub fn close(&self, id: &str) {
            self.active.write().unwrap().remove(id);
        }
    }

}

pub mod apikey {
    /// Generates a fresh API key. The caller persists it through the
    /// store, which replaces (and thereby immediately invalidates) the
    /// previous key. Comparison against client-supplied keys is exact
    /// string equality.
    pub fn generate() -> String {
        super::random_secret()
    }

    #[cfg(test)]
    mod test {
        #[test]
        fn keys_are_long_and_unique() {
            let first = super::generate();
            let second = super::generate();

            assert_eq!(first.len(), 64);
            assert_ne!(first, second);
        }
    }
}

pub mod credentials {
    use argon2::password_hash::{PasswordHash, SaltString};
    use argon2::{Argon2, PasswordHasher, PasswordVerifier};

    /// Hashes a password into a PHC string for storage in configuration.
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);

        Ok(Argon2::default()
            .hash_password(password.as_bytes(), &salt)?
            .to_string())
    }

    /// Verifies a password against a stored PHC hash. Any failure,
    /// including an unparsable hash, reads as a mismatch.
    pub fn verify_password(password: &str, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash)
            .map(|hash| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &hash)
                    .is_ok()
            })
            .unwrap_or(false)
    }

}

pub mod token {
    use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
    use serde::{Deserialize, Serialize};
    use time::OffsetDateTime;

    use crate::errors::BackendError;

    /// The fixed bearer-token lifetime.
    pub const TOKEN_TTL_MINUTES: i64 = 30;

    /// The subject of a token issued against the admin credentials.
    pub const SUBJECT_ADMIN: &str = "admin_user";

    /// The subject of a token issued against the API key.
    pub const SUBJECT_API_KEY: &str = "api_key_client";

    /// The claims carried by a bearer token.
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Claims {
        pub sub: String,
        pub iat: i64,
        pub exp: i64,
    }

    /// Signs a token for the given subject, expiring 30 minutes from now.
    pub fn issue(secret: &[u8], subject: &str) -> Result<String, BackendError> {
        issue_at(secret, subject, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        secret: &[u8],
        subject: &str,
        now: OffsetDateTime,
    ) -> Result<String, BackendError> {
        let issued_at = now.unix_timestamp();
        let claims = Claims {
            sub: subject.to_owned(),
            iat: issued_at,
            exp: issued_at + TOKEN_TTL_MINUTES * 60,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
            .map_err(|source| BackendError::TokenIssuance { source })
    }

    /// Checks signature and expiry. Every failure collapses to
    /// `Unauthorized`; callers never learn which check failed.
    pub fn verify(secret: &[u8], token: &str) -> Result<Claims, BackendError> {
        let validation = Validation {
            leeway: 0,
            ..Validation::default()
        };

        decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
            .map(|data| data.claims)
            .map_err(|_| BackendError::Unauthorized)
    }

}
