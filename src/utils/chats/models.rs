use serde::{Deserialize, Serialize};

use crate::modules::store::Timestamp;

/// Chat room stored under `chats/{id}`. The id is the document id and is not
/// part of the stored fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Pointer to the chat the message view shows.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Chat(String),
}

impl Selection {
    pub fn chat_id(&self) -> Option<&str> {
        match self {
            Selection::None => None,
            Selection::Chat(id) => Some(id),
        }
    }
}

/// Header of the message view, derived from the selection and the roster.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedChat {
    pub selected_chat_id: Option<String>,
    pub selected_chat_name: String,
    pub selected_chat_color: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterState {
    #[serde(skip)]
    pub principal: String,
    pub rooms: Vec<ChatRoom>,
    pub selection: Selection,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewChat {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Friends picked as members besides the creator.
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatEdit {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Full member list after the edit, the editor included.
    pub members: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMember {
    pub uid: String,
    pub display_name: String,
}

/// Current values of a chat, prepared for the edit form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEditForm {
    pub id: String,
    pub name: String,
    pub color: String,
    pub members: Vec<ChatMember>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct CreatedChat {
    pub id: String,
}
