use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat name cannot be empty")]
    EmptyName,
    #[error("Invalid chat color {0}")]
    InvalidColor(String),
    #[error("You cannot remove yourself from the chat")]
    SelfRemoval,
    #[error("Chat not found")]
    ChatNotFound,
    #[error("You are not allowed to edit this chat")]
    NotMember,
    #[error("User {0} is not your friend")]
    NotAFriend(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let info = self.to_string();
        let status_code = match self {
            ChatError::EmptyName => StatusCode::BAD_REQUEST,
            ChatError::InvalidColor(_) => StatusCode::BAD_REQUEST,
            ChatError::SelfRemoval => StatusCode::BAD_REQUEST,
            ChatError::ChatNotFound => StatusCode::NOT_FOUND,
            ChatError::NotMember => StatusCode::FORBIDDEN,
            ChatError::NotAFriend(_) => StatusCode::BAD_REQUEST,
            ChatError::Unexpected(e) => return AppError::Unexpected(e).into_response(),
        };

        AppError::exp(status_code, &info).into_response()
    }
}
