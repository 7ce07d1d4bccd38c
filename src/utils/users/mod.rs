pub mod errors;
pub mod models;

use anyhow::Context;
use std::collections::HashSet;
use tracing::{debug, warn};

use self::{
    errors::UserError,
    models::{UserRecord, UserSearchResult},
};
use crate::modules::{
    auth::{AuthSession, Principal, ProfileUpdate},
    store::{paths, to_document, DocumentStore, Query, SetMode},
};
use crate::utils::friends::models::Relationships;

pub const UNKNOWN_USER: &str = "[Unknown user]";

/// Upper bound appended to a search term to turn a range query into a prefix match.
const PREFIX_END: char = '\u{f8ff}';

/// Profile name if set, else the part of the e-mail before `@`.
pub fn display_name_or_email(display_name: Option<&str>, email: Option<&str>) -> Option<String> {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| {
            email
                .and_then(|email| email.split('@').next())
                .map(str::trim)
                .filter(|local| !local.is_empty())
        })
        .map(str::to_string)
}

/// Creates or refreshes `users/{uid}` from the auth profile. Merge write, so
/// fields this function does not know about survive.
pub async fn upsert_user_document(
    store: &dyn DocumentStore,
    principal: &Principal,
) -> Result<(), UserError> {
    let record = UserRecord {
        uid: principal.uid.clone(),
        email: Some(principal.email.clone()),
        display_name: Some(
            display_name_or_email(principal.display_name.as_deref(), Some(&principal.email))
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        ),
        photo_url: principal.photo_url.clone(),
        created_at: Some(principal.created_at),
        last_sign_in_time: Some(principal.last_sign_in_time),
    };

    store
        .set(
            &paths::user(&principal.uid),
            to_document(&record).context("Failed to encode user record")?,
            SetMode::Merge,
        )
        .await
        .context("Failed to upsert user record")?;

    debug!("User record updated for {}", principal.uid);
    Ok(())
}

/// Prefix search over display names and e-mails. Neither the principal nor
/// anyone already related to it shows up.
pub async fn search_users(
    store: &dyn DocumentStore,
    term: &str,
    principal: &str,
    related: &Relationships,
) -> Result<Vec<UserSearchResult>, UserError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(UserError::EmptySearch);
    }
    let upper = format!("{term}{PREFIX_END}");

    let by_name = Query::new(paths::users())
        .where_gte("displayName", term)
        .where_lte("displayName", upper.as_str());
    let by_email = Query::new(paths::users())
        .where_gte("email", term)
        .where_lte("email", upper.as_str());

    let (by_name, by_email) = futures::try_join!(store.query(&by_name), store.query(&by_email))
        .context("Failed to search users")?;

    let mut seen = HashSet::new();
    let mut results = Vec::new();
    for doc in by_name.docs.iter().chain(by_email.docs.iter()) {
        if doc.id == principal || related.contains(&doc.id) || !seen.insert(doc.id.clone()) {
            continue;
        }
        let user: UserRecord = match doc.decode() {
            Ok(user) => user,
            Err(e) => {
                warn!("Skipping unreadable user record: {e}");
                continue;
            }
        };
        results.push(UserSearchResult {
            uid: doc.id.clone(),
            display_name: user
                .resolved_name()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            photo_url: user.photo_url,
        });
    }

    Ok(results)
}

/// Updates the auth profile, then mirrors it into the user record so other
/// users resolve the new name.
pub async fn update_profile(
    auth: &AuthSession,
    store: &dyn DocumentStore,
    update: ProfileUpdate,
) -> Result<Principal, UserError> {
    let principal = auth.update_profile(update).await?;
    upsert_user_document(store, &principal).await?;
    Ok(principal)
}
