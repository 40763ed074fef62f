pub mod aggregation;
pub mod auth;
pub mod config;
pub mod dates;
pub mod environment;
pub mod errors;
pub mod export;
pub mod registration;
pub mod routes;
pub mod store;
pub mod validation;
