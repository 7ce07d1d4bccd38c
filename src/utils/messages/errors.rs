use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("Cannot send an empty message")]
    EmptyMessage,
    #[error("No chat selected")]
    NoChatSelected,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for MessageError {
    fn into_response(self) -> axum::response::Response {
        let info = self.to_string();
        let status_code = match self {
            MessageError::EmptyMessage => StatusCode::BAD_REQUEST,
            MessageError::NoChatSelected => StatusCode::BAD_REQUEST,
            MessageError::Unexpected(e) => return AppError::Unexpected(e).into_response(),
        };

        AppError::exp(status_code, &info).into_response()
    }
}
