use serde::{Deserialize, Serialize};

use crate::modules::store::Timestamp;

pub const SYSTEM_UID: &str = "system";
pub const SYSTEM_NAME: &str = "System";

/// Message stored under `chats/{chat}/messages/{id}`. Immutable once written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl Message {
    pub fn system(text: String) -> Self {
        Self {
            id: String::new(),
            text,
            created_at: Some(Timestamp::now()),
            uid: SYSTEM_UID.to_string(),
            display_name: Some(SYSTEM_NAME.to_string()),
            photo_url: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.uid == SYSTEM_UID
    }
}

/// Messages of one chat, oldest first. `chat_id` tags which chat the list
/// belongs to.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    pub chat_id: Option<String>,
    pub messages: Vec<Message>,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NewMessage {
    pub text: String,
}
