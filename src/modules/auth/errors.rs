use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Missing credential")]
    MissingCredential,
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    #[error("Email already in use")]
    EmailAlreadyInUse,
    #[error("Incorrect email or password")]
    WrongCredentials,
    #[error("User does not exist")]
    UserNotFound,
    #[error("Not signed in")]
    NotSignedIn,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let info = self.to_string();
        let status_code = match self {
            AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
            AuthError::MissingCredential => StatusCode::BAD_REQUEST,
            AuthError::WeakPassword => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyInUse => StatusCode::BAD_REQUEST,
            AuthError::WrongCredentials => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
            AuthError::Unexpected(e) => return AppError::Unexpected(e).into_response(),
        };

        AppError::exp(status_code, &info).into_response()
    }
}
