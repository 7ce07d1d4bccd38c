use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::store::Timestamp;
use crate::utils::users::display_name_or_email;

/// The authenticated user as seen by the auth backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub created_at: Timestamp,
    pub last_sign_in_time: Timestamp,
}

impl Principal {
    /// Name shown to other users: the profile name, else the e-mail local part.
    pub fn resolved_name(&self) -> String {
        display_name_or_email(self.display_name.as_deref(), Some(&self.email))
            .unwrap_or_else(|| self.email.clone())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Identity asserted by an external provider after a successful popup flow.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentity {
    pub provider: String,
    pub subject: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl ProfileUpdate {
    /// Blank values clear the field.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            display_name: clean(self.display_name),
            photo_url: clean(self.photo_url),
        }
    }
}
