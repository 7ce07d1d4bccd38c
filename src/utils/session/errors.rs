use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::errors::AppError;
use crate::modules::auth::AuthError;
use crate::utils::{
    chats::errors::ChatError, friends::errors::FriendError, messages::errors::MessageError,
    users::errors::UserError,
};

pub const LOGIN_ROUTE: &str = "/auth/login";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Not signed in")]
    SignedOut,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Friend(#[from] FriendError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionError::SignedOut => {
                AppError::redirect(StatusCode::UNAUTHORIZED, "Not signed in", LOGIN_ROUTE)
                    .into_response()
            }
            SessionError::Auth(e) => e.into_response(),
            SessionError::User(e) => e.into_response(),
            SessionError::Friend(e) => e.into_response(),
            SessionError::Chat(e) => e.into_response(),
            SessionError::Message(e) => e.into_response(),
            SessionError::App(e) => e.into_response(),
            SessionError::Unexpected(e) => AppError::Unexpected(e).into_response(),
        }
    }
}
