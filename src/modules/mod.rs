pub mod auth;
pub mod extractors;
pub mod store;
pub mod tokens;
