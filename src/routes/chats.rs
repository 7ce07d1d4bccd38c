use axum::{
    debug_handler,
    extract::Path,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::modules::extractors::session::SignedIn;
use crate::state::AppState;
use crate::utils::{
    chats::{
        models::{ChatEdit, ChatEditForm, CreatedChat, NewChat, RosterState, SelectedChat},
        PALETTE,
    },
    session::errors::SessionError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(user_chats).post(create_chat))
        .route("/palette", get(palette))
        .route("/:id", put(edit_chat))
        .route("/:id/select", post(select_chat))
        .route("/:id/edit", get(chat_for_edit))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatList {
    #[serde(flatten)]
    roster: RosterState,
    selected_chat: SelectedChat,
}

#[debug_handler(state = AppState)]
async fn user_chats(SignedIn(workspace): SignedIn) -> Json<ChatList> {
    let roster = workspace.roster();
    Json(ChatList {
        selected_chat: roster.selected_chat(),
        roster,
    })
}

async fn palette() -> Json<[&'static str; 14]> {
    Json(PALETTE)
}

#[debug_handler(state = AppState)]
async fn create_chat(
    SignedIn(workspace): SignedIn,
    Json(chat): Json<NewChat>,
) -> Result<(StatusCode, Json<CreatedChat>), SessionError> {
    let id = workspace.create_chat(chat).await?;
    Ok((StatusCode::CREATED, Json(CreatedChat { id })))
}

#[debug_handler(state = AppState)]
async fn select_chat(
    SignedIn(workspace): SignedIn,
    Path(id): Path<String>,
) -> Result<Json<SelectedChat>, SessionError> {
    workspace.select_chat(&id)?;
    Ok(Json(workspace.selected_chat()))
}

#[debug_handler(state = AppState)]
async fn chat_for_edit(
    SignedIn(workspace): SignedIn,
    Path(id): Path<String>,
) -> Result<Json<ChatEditForm>, SessionError> {
    Ok(Json(workspace.load_chat_for_edit(&id).await?))
}

#[debug_handler(state = AppState)]
async fn edit_chat(
    SignedIn(workspace): SignedIn,
    Path(id): Path<String>,
    Json(edit): Json<ChatEdit>,
) -> Result<(), SessionError> {
    workspace.edit_chat(&id, edit).await
}
