use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::modules::store::Timestamp;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
}

/// One half of a relationship, stored under `users/{self}/friends/{other}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRecord {
    pub status: FriendStatus,
    pub initiated_by: String,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub uid: String,
    pub display_name: String,
    pub status: FriendStatus,
    pub initiated_by: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Relationships {
    pub accepted: Vec<Friend>,
    pub sent: Vec<Friend>,
    pub received: Vec<Friend>,
}

impl Relationships {
    pub fn has_pending(&self) -> bool {
        !self.sent.is_empty() || !self.received.is_empty()
    }

    pub fn accepted_ids(&self) -> Vec<String> {
        self.accepted.iter().map(|f| f.uid.clone()).collect()
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.accepted
            .iter()
            .chain(self.sent.iter())
            .chain(self.received.iter())
            .any(|f| f.uid == uid)
    }
}

/// Published state of the relationship sync.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipsView {
    #[serde(flatten)]
    pub lists: Relationships,
    pub loaded: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipMutation {
    Request,
    Accept,
    Remove,
}

impl Display for RelationshipMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipMutation::Request => write!(f, "send friend request"),
            RelationshipMutation::Accept => write!(f, "accept friend request"),
            RelationshipMutation::Remove => write!(f, "remove friend"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FriendRequest {
    pub uid: String,
}
