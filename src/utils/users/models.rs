use serde::{Deserialize, Serialize};

use crate::modules::store::Timestamp;

/// Stored under `users/{uid}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub last_sign_in_time: Option<Timestamp>,
}

impl UserRecord {
    pub fn resolved_name(&self) -> Option<String> {
        super::display_name_or_email(self.display_name.as_deref(), self.email.as_deref())
    }
}

#[derive(Deserialize, Debug)]
pub struct UserSearch {
    pub term: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSearchResult {
    pub uid: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}
