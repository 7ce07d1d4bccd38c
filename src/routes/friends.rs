use axum::{
    debug_handler,
    extract::{Path, Query},
    routing::{delete, get, post},
    Json, Router,
};

use crate::modules::extractors::session::SignedIn;
use crate::state::AppState;
use crate::utils::{
    friends::models::{FriendRequest, RelationshipsView},
    session::errors::SessionError,
    users::models::{UserSearch, UserSearchResult},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user_friends))
        .route("/search", get(search_users))
        .route("/requests", post(send_friend_request))
        .route("/:uid/accept", post(accept_friend_request))
        .route("/:uid", delete(remove_friend))
}

#[debug_handler(state = AppState)]
async fn user_friends(SignedIn(workspace): SignedIn) -> Json<RelationshipsView> {
    Json(workspace.relationships())
}

#[debug_handler(state = AppState)]
async fn search_users(
    SignedIn(workspace): SignedIn,
    Query(search): Query<UserSearch>,
) -> Result<Json<Vec<UserSearchResult>>, SessionError> {
    Ok(Json(workspace.search_users(&search.term).await?))
}

#[debug_handler(state = AppState)]
async fn send_friend_request(
    SignedIn(workspace): SignedIn,
    Json(request): Json<FriendRequest>,
) -> Result<(), SessionError> {
    workspace.send_friend_request(&request.uid).await
}

#[debug_handler(state = AppState)]
async fn accept_friend_request(
    SignedIn(workspace): SignedIn,
    Path(uid): Path<String>,
) -> Result<(), SessionError> {
    workspace.accept_friend_request(&uid).await
}

/// Rejects, cancels or unfriends, whichever applies.
#[debug_handler(state = AppState)]
async fn remove_friend(
    SignedIn(workspace): SignedIn,
    Path(uid): Path<String>,
) -> Result<(), SessionError> {
    workspace.remove_friend(&uid).await
}
