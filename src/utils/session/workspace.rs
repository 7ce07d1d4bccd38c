use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{errors::SessionError, models::ViewState};
use crate::modules::{
    auth::Principal,
    store::{DocumentStore, StoreRef},
};
use crate::utils::{
    chats::{
        self,
        errors::ChatError,
        models::{ChatEdit, ChatEditForm, NewChat, RosterState, SelectedChat},
        RosterSync,
    },
    friends::{self, models::RelationshipsView, RelationshipSync},
    messages::{self, models::MessageLog, MessageSync},
    users::{self, models::UserSearchResult},
};

const SELECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The live syncs of one signed-in principal. Dropping it ends every live
/// query it owns.
pub struct Workspace {
    uid: String,
    store: StoreRef,
    principal: watch::Receiver<Option<Principal>>,
    relationships: RelationshipSync,
    roster: RosterSync,
    messages: MessageSync,
}

impl Workspace {
    pub fn new(store: StoreRef, uid: &str, principal: watch::Receiver<Option<Principal>>) -> Self {
        let relationships = RelationshipSync::spawn(store.clone(), uid.to_string());
        let roster = RosterSync::spawn(store.clone(), uid.to_string());
        let messages = MessageSync::spawn(store.clone(), roster.subscribe());
        Self {
            uid: uid.to_string(),
            store,
            principal,
            relationships,
            roster,
            messages,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Profile as of now. Fails once the workspace's principal signed out.
    pub fn principal(&self) -> Result<Principal, SessionError> {
        match &*self.principal.borrow() {
            Some(principal) if principal.uid == self.uid => Ok(principal.clone()),
            _ => Err(SessionError::SignedOut),
        }
    }

    fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn relationships(&self) -> RelationshipsView {
        self.relationships.current()
    }

    pub fn roster(&self) -> RosterState {
        self.roster.current()
    }

    pub fn selected_chat(&self) -> SelectedChat {
        self.roster.current().selected_chat()
    }

    pub fn messages(&self) -> MessageLog {
        self.messages.current()
    }

    pub fn view(&self) -> Result<ViewState, SessionError> {
        let relationships = self.relationships();
        let roster = self.roster();
        Ok(ViewState {
            principal: self.principal()?,
            has_pending_requests: relationships.lists.has_pending(),
            relationships,
            selected_chat: roster.selected_chat(),
            roster,
            messages: self.messages(),
        })
    }

    pub fn watch(&self) -> WorkspaceWatch {
        WorkspaceWatch {
            principal: self.principal.clone(),
            relationships: self.relationships.subscribe(),
            roster: self.roster.subscribe(),
            messages: self.messages.subscribe(),
        }
    }

    pub async fn send_friend_request(&self, target: &str) -> Result<(), SessionError> {
        friends::send_friend_request(self.store(), &self.uid, target).await?;
        Ok(())
    }

    pub async fn accept_friend_request(&self, requester: &str) -> Result<(), SessionError> {
        friends::accept_friend_request(self.store(), &self.uid, requester).await?;
        Ok(())
    }

    pub async fn remove_friend(&self, other: &str) -> Result<(), SessionError> {
        friends::remove_relationship(self.store(), &self.uid, other).await?;
        Ok(())
    }

    /// Users matching `term` that are neither the principal nor related to it.
    pub async fn search_users(&self, term: &str) -> Result<Vec<UserSearchResult>, SessionError> {
        let related = self.relationships().lists;
        Ok(users::search_users(self.store(), term, &self.uid, &related).await?)
    }

    pub async fn create_chat(&self, chat: NewChat) -> Result<String, SessionError> {
        let principal = self.principal()?;
        let friends = self.relationships().lists.accepted_ids();
        let chat_id = chats::create_chat(self.store(), &principal, &friends, chat).await?;
        self.select_written(&chat_id).await;
        Ok(chat_id)
    }

    pub async fn edit_chat(&self, chat_id: &str, edit: ChatEdit) -> Result<(), SessionError> {
        let friends = self.relationships().lists.accepted_ids();
        chats::edit_chat(self.store(), &self.uid, &friends, chat_id, edit).await?;
        self.select_written(chat_id).await;
        Ok(())
    }

    pub async fn load_chat_for_edit(&self, chat_id: &str) -> Result<ChatEditForm, SessionError> {
        let principal = self.principal()?;
        Ok(chats::load_chat_for_edit(self.store(), &principal, chat_id).await?)
    }

    /// Only chats of the roster can be picked.
    pub fn select_chat(&self, chat_id: &str) -> Result<(), SessionError> {
        if self.roster.current().room(chat_id).is_none() {
            return Err(ChatError::ChatNotFound.into());
        }
        self.roster.select(chat_id);
        Ok(())
    }

    pub async fn send_message(&self, text: &str) -> Result<String, SessionError> {
        let principal = self.principal()?;
        let selection = self.roster.current().selection;
        Ok(messages::send_message(self.store(), &principal, &selection, text).await?)
    }

    async fn select_written(&self, chat_id: &str) {
        if tokio::time::timeout(SELECT_TIMEOUT, self.roster.select_when_listed(chat_id))
            .await
            .is_err()
        {
            warn!("Chat {chat_id} did not show up in the roster of {}", self.uid);
            return;
        }
        debug!("Selected chat {chat_id} after write");
    }
}

/// Waits for any change of a workspace's published state.
pub struct WorkspaceWatch {
    principal: watch::Receiver<Option<Principal>>,
    relationships: watch::Receiver<RelationshipsView>,
    roster: watch::Receiver<RosterState>,
    messages: watch::Receiver<MessageLog>,
}

impl WorkspaceWatch {
    /// `false` once any of the sources is gone.
    pub async fn changed(&mut self) -> bool {
        let res = tokio::select! {
            res = self.principal.changed() => res,
            res = self.relationships.changed() => res,
            res = self.roster.changed() => res,
            res = self.messages.changed() => res,
        };
        res.is_ok()
    }
}
