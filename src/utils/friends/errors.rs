use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;
use tracing::error;

use super::models::RelationshipMutation;
use crate::errors::AppError;
use crate::modules::store::StoreError;

#[derive(Error, Debug)]
pub enum FriendError {
    #[error("Cannot send a friend request to yourself")]
    SelfRequest,
    #[error("User does not exist")]
    UserNotFound,
    #[error("Already a friend")]
    AlreadyFriend,
    #[error("Friend request already sent")]
    RequestSentAlready,
    #[error("This user already sent you a friend request")]
    RequestPending,
    #[error("Friend request is missing")]
    RequestMissing,
    /// The principal's side was written, the counterpart's side was not.
    #[error("Failed to {mutation}: only {applied} was updated")]
    OneSided {
        mutation: RelationshipMutation,
        applied: String,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl IntoResponse for FriendError {
    fn into_response(self) -> axum::response::Response {
        let info = self.to_string();
        let status_code = match self {
            FriendError::SelfRequest => StatusCode::BAD_REQUEST,
            FriendError::UserNotFound => StatusCode::NOT_FOUND,
            FriendError::AlreadyFriend => StatusCode::BAD_REQUEST,
            FriendError::RequestSentAlready => StatusCode::BAD_REQUEST,
            FriendError::RequestPending => StatusCode::BAD_REQUEST,
            FriendError::RequestMissing => StatusCode::BAD_REQUEST,
            FriendError::OneSided { mutation, .. } => {
                error!("{info}");
                return AppError::exp(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &format!("Failed to {mutation}"),
                )
                .into_response();
            }
            FriendError::Unexpected(e) => return AppError::Unexpected(e).into_response(),
        };

        AppError::exp(status_code, &info).into_response()
    }
}
