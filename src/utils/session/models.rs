use serde::Serialize;
use std::sync::Arc;

use super::Workspace;
use crate::modules::auth::Principal;
use crate::utils::{
    chats::models::{RosterState, SelectedChat},
    friends::models::RelationshipsView,
    messages::models::MessageLog,
};

#[derive(Clone)]
pub enum SessionState {
    /// The principal stream has not been read yet.
    Loading,
    SignedIn(Arc<Workspace>),
    SignedOut,
}

/// Everything the chat screens render, in one document.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub principal: Principal,
    pub relationships: RelationshipsView,
    pub has_pending_requests: bool,
    pub roster: RosterState,
    pub selected_chat: SelectedChat,
    pub messages: MessageLog,
}
