pub mod errors;
pub mod models;

use anyhow::Context;
use futures::future::join_all;
use serde_json::json;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, warn};

use self::{
    errors::FriendError,
    models::{
        Friend, FriendRecord, FriendStatus, Relationships, RelationshipMutation, RelationshipsView,
    },
};
use crate::modules::store::{
    paths, to_document, DocPath, DocumentStore, Query, QuerySnapshot, SetMode, StoreError,
    StoreRef, Timestamp,
};
use crate::utils::users::{models::UserRecord, UNKNOWN_USER};

pub const LOAD_ERROR: &str = "[Load error]";

/// Sorts resolved relationships into accepted, sent and received. Every
/// record lands in exactly one list.
pub fn partition(principal: &str, friends: Vec<Friend>) -> Relationships {
    let mut lists = Relationships::default();
    for friend in friends {
        match friend.status {
            FriendStatus::Accepted => lists.accepted.push(friend),
            FriendStatus::Pending if friend.initiated_by == principal => lists.sent.push(friend),
            FriendStatus::Pending => lists.received.push(friend),
        }
    }
    lists
}

impl RelationshipsView {
    pub fn apply_snapshot(self, principal: &str, friends: Vec<Friend>) -> Self {
        Self {
            lists: partition(principal, friends),
            loaded: true,
            error: None,
        }
    }

    /// Lists are cleared rather than left stale.
    pub fn apply_error(self, message: String) -> Self {
        Self {
            lists: Relationships::default(),
            loaded: true,
            error: Some(message),
        }
    }
}

async fn resolve_counterpart(store: &dyn DocumentStore, uid: &str) -> String {
    match store.get(&paths::user(uid)).await {
        Ok(Some(doc)) => match doc.decode::<UserRecord>() {
            Ok(user) => user
                .resolved_name()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            Err(e) => {
                error!("Failed to decode friend {uid}: {e}");
                LOAD_ERROR.to_string()
            }
        },
        Ok(None) => {
            warn!("Friend user document not found for {uid}");
            UNKNOWN_USER.to_string()
        }
        Err(e) => {
            error!("Failed to fetch friend details for {uid}: {e}");
            LOAD_ERROR.to_string()
        }
    }
}

/// Point-reads every counterpart's user record in parallel.
pub async fn resolve_friends(store: &dyn DocumentStore, snapshot: &QuerySnapshot) -> Vec<Friend> {
    let records: Vec<(String, FriendRecord)> = snapshot
        .docs
        .iter()
        .filter_map(|doc| match doc.decode::<FriendRecord>() {
            Ok(record) => Some((doc.id.clone(), record)),
            Err(e) => {
                warn!("Skipping unreadable relationship record: {e}");
                None
            }
        })
        .collect();

    let names = join_all(
        records
            .iter()
            .map(|(uid, _)| resolve_counterpart(store, uid)),
    )
    .await;

    records
        .into_iter()
        .zip(names)
        .map(|((uid, record), display_name)| Friend {
            uid,
            display_name,
            status: record.status,
            initiated_by: record.initiated_by,
        })
        .collect()
}

async fn read_own_record(
    store: &dyn DocumentStore,
    principal: &str,
    other: &str,
) -> Result<Option<FriendRecord>, FriendError> {
    let Some(doc) = store
        .get(&paths::friend(principal, other))
        .await
        .context("Failed to select friend record")?
    else {
        return Ok(None);
    };
    Ok(Some(doc.decode().context("Failed to decode friend record")?))
}

pub async fn send_friend_request(
    store: &dyn DocumentStore,
    principal: &str,
    target: &str,
) -> Result<(), FriendError> {
    if principal == target {
        return Err(FriendError::SelfRequest);
    }

    //? is there a relationship already
    if let Some(record) = read_own_record(store, principal, target).await? {
        return Err(match record.status {
            FriendStatus::Accepted => FriendError::AlreadyFriend,
            FriendStatus::Pending if record.initiated_by == principal => {
                FriendError::RequestSentAlready
            }
            FriendStatus::Pending => FriendError::RequestPending,
        });
    }

    let exists = store
        .get(&paths::user(target))
        .await
        .context("Failed to select user")?
        .is_some();
    if !exists {
        return Err(FriendError::UserNotFound);
    }

    apply_relationship_mutation(store, principal, target, RelationshipMutation::Request).await
}

pub async fn accept_friend_request(
    store: &dyn DocumentStore,
    principal: &str,
    requester: &str,
) -> Result<(), FriendError> {
    match read_own_record(store, principal, requester).await? {
        Some(record)
            if record.status == FriendStatus::Pending && record.initiated_by != principal => {}
        _ => return Err(FriendError::RequestMissing),
    }

    apply_relationship_mutation(store, principal, requester, RelationshipMutation::Accept).await
}

/// Rejects or cancels a request, or ends a friendship.
pub async fn remove_relationship(
    store: &dyn DocumentStore,
    principal: &str,
    other: &str,
) -> Result<(), FriendError> {
    apply_relationship_mutation(store, principal, other, RelationshipMutation::Remove).await
}

/// Writes both halves of a relationship, the principal's first. The writes
/// are not transactional: when the second one fails the first stays applied
/// and [`FriendError::OneSided`] is returned.
pub async fn apply_relationship_mutation(
    store: &dyn DocumentStore,
    principal: &str,
    other: &str,
    mutation: RelationshipMutation,
) -> Result<(), FriendError> {
    let own = paths::friend(principal, other);
    let theirs = paths::friend(other, principal);

    write_side(store, &own, principal, mutation)
        .await
        .with_context(|| format!("Failed to {mutation} at {own}"))?;

    if let Err(source) = write_side(store, &theirs, principal, mutation).await {
        error!("Paired write left {own} without {theirs}: {source}");
        return Err(FriendError::OneSided {
            mutation,
            applied: own.to_string(),
            source,
        });
    }

    debug!("{mutation}: {principal} <-> {other}");
    Ok(())
}

async fn write_side(
    store: &dyn DocumentStore,
    path: &DocPath,
    principal: &str,
    mutation: RelationshipMutation,
) -> Result<(), StoreError> {
    match mutation {
        RelationshipMutation::Request => {
            let record = FriendRecord {
                status: FriendStatus::Pending,
                initiated_by: principal.to_string(),
                timestamp: Some(Timestamp::now()),
            };
            store
                .set(path, to_document(&record)?, SetMode::Overwrite)
                .await
        }
        RelationshipMutation::Accept => {
            store
                .update(path, to_document(&json!({ "status": FriendStatus::Accepted }))?)
                .await
        }
        RelationshipMutation::Remove => store.delete(path).await,
    }
}

/// Live accepted/sent/received lists of one principal.
pub struct RelationshipSync {
    state: watch::Receiver<RelationshipsView>,
    task: JoinHandle<()>,
}

impl RelationshipSync {
    pub fn spawn(store: StoreRef, principal: String) -> Self {
        let (tx, state) = watch::channel(RelationshipsView::default());

        let task = tokio::spawn(async move {
            let mut subscription = store.subscribe(Query::new(paths::friends(&principal)));
            debug!("Listening for friends and requests of {principal}");

            while let Some(delivery) = subscription.next().await {
                let previous = tx.borrow().clone();
                let next = match delivery {
                    Ok(snapshot) => {
                        let friends = resolve_friends(store.as_ref(), &snapshot).await;
                        previous.apply_snapshot(&principal, friends)
                    }
                    Err(e) => {
                        error!("Failed to fetch friends and requests: {e}");
                        previous.apply_error(format!("Failed to load friends and requests: {e}"))
                    }
                };
                tx.send_replace(next);
            }
        });

        Self { state, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<RelationshipsView> {
        self.state.clone()
    }

    pub fn current(&self) -> RelationshipsView {
        self.state.borrow().clone()
    }
}

impl Drop for RelationshipSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}
