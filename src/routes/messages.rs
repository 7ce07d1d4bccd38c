use axum::{debug_handler, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::modules::extractors::session::SignedIn;
use crate::state::AppState;
use crate::utils::{
    messages::models::{MessageLog, NewMessage},
    session::errors::SessionError,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(selected_chat_messages).post(send_message))
}

#[debug_handler(state = AppState)]
async fn selected_chat_messages(SignedIn(workspace): SignedIn) -> Json<MessageLog> {
    Json(workspace.messages())
}

#[debug_handler(state = AppState)]
async fn send_message(
    SignedIn(workspace): SignedIn,
    Json(message): Json<NewMessage>,
) -> Result<(StatusCode, Json<Value>), SessionError> {
    let id = workspace.send_message(&message.text).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}
