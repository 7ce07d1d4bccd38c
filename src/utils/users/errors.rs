use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::errors::AppError;
use crate::modules::auth::AuthError;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Search term is empty")]
    EmptySearch,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for UserError {
    fn into_response(self) -> axum::response::Response {
        let info = self.to_string();
        match self {
            UserError::EmptySearch => AppError::exp(StatusCode::BAD_REQUEST, &info).into_response(),
            UserError::Auth(e) => e.into_response(),
            UserError::Unexpected(e) => AppError::Unexpected(e).into_response(),
        }
    }
}
