use axum::{debug_handler, routing::get, Json, Router};

use crate::modules::{
    auth::{Principal, ProfileUpdate},
    extractors::session::ClientSession,
};
use crate::state::AppState;
use crate::utils::session::errors::SessionError;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_profile).put(put_profile))
}

#[debug_handler(state = AppState)]
async fn get_profile(session: ClientSession) -> Result<Json<Principal>, SessionError> {
    Ok(Json(session.session.principal()?))
}

#[debug_handler(state = AppState)]
async fn put_profile(
    session: ClientSession,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Principal>, SessionError> {
    let principal = session.session.update_profile(update).await?;
    Ok(Json(principal))
}
