pub mod errors;
pub mod models;

use anyhow::Context;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, warn};

use self::{
    errors::MessageError,
    models::{Message, MessageLog},
};
use crate::modules::{
    auth::Principal,
    store::{
        paths, to_document, Delivery, Direction, DocumentStore, Query, QuerySnapshot, StoreRef,
        Subscription, Timestamp,
    },
};
use crate::utils::chats::models::{RosterState, Selection};

impl MessageLog {
    /// Empty, not yet loaded log for a newly selected chat.
    pub fn for_chat(chat_id: Option<String>) -> Self {
        Self {
            loaded: chat_id.is_none(),
            chat_id,
            messages: Vec::new(),
            error: None,
        }
    }

    /// Snapshots of any other chat than the one the log is for are ignored.
    pub fn apply_snapshot(self, chat_id: &str, messages: Vec<Message>) -> Self {
        if self.chat_id.as_deref() != Some(chat_id) {
            return self;
        }
        Self {
            messages,
            loaded: true,
            error: None,
            ..self
        }
    }

    pub fn apply_error(self, chat_id: &str, message: String) -> Self {
        if self.chat_id.as_deref() != Some(chat_id) {
            return self;
        }
        Self {
            messages: Vec::new(),
            loaded: true,
            error: Some(message),
            ..self
        }
    }
}

fn decode_messages(snapshot: QuerySnapshot) -> Vec<Message> {
    snapshot
        .docs
        .into_iter()
        .filter_map(|doc| match doc.decode::<Message>() {
            Ok(message) => Some(Message { id: doc.id, ..message }),
            Err(e) => {
                warn!("Skipping unreadable message: {e}");
                None
            }
        })
        .collect()
}

/// Appends a message to the selected chat. Name and avatar are taken from the
/// sender's profile as it is now.
pub async fn send_message(
    store: &dyn DocumentStore,
    principal: &Principal,
    selection: &Selection,
    text: &str,
) -> Result<String, MessageError> {
    if text.trim().is_empty() {
        return Err(MessageError::EmptyMessage);
    }
    let Some(chat_id) = selection.chat_id() else {
        return Err(MessageError::NoChatSelected);
    };

    let message = Message {
        id: String::new(),
        text: text.to_string(),
        created_at: Some(Timestamp::now()),
        uid: principal.uid.clone(),
        display_name: Some(principal.resolved_name()),
        photo_url: principal.photo_url.clone(),
    };
    let path = store
        .add(
            &paths::messages(chat_id),
            to_document(&message).context("Failed to encode message")?,
        )
        .await
        .context("Failed to send message")?;

    debug!("Message {} sent to {chat_id}", path.id());
    Ok(path.id().to_string())
}

fn subscribe_to_chat(store: &StoreRef, chat_id: &str) -> Subscription {
    store.subscribe(
        Query::new(paths::messages(chat_id)).order_by("createdAt", Direction::Ascending),
    )
}

async fn next_delivery(subscription: &mut Option<Subscription>) -> Option<Delivery> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

enum Event {
    SelectionChanged,
    RosterClosed,
    Delivery(Option<Delivery>),
}

/// Live message log of whichever chat the roster has selected.
pub struct MessageSync {
    state: watch::Receiver<MessageLog>,
    task: JoinHandle<()>,
}

impl MessageSync {
    pub fn spawn(store: StoreRef, mut roster: watch::Receiver<RosterState>) -> Self {
        let (tx, state) = watch::channel(MessageLog::for_chat(None));

        let task = tokio::spawn(async move {
            let mut current: Option<String> = None;
            let mut subscription: Option<Subscription> = None;

            loop {
                let wanted = roster
                    .borrow_and_update()
                    .selection
                    .chat_id()
                    .map(str::to_string);
                if wanted != current {
                    // the old live query goes away before the new one starts
                    drop(subscription.take());
                    debug!("Message log switching to {wanted:?}");
                    tx.send_replace(MessageLog::for_chat(wanted.clone()));
                    subscription = wanted.as_deref().map(|id| subscribe_to_chat(&store, id));
                    current = wanted;
                }

                let event = tokio::select! {
                    changed = roster.changed() => match changed {
                        Ok(()) => Event::SelectionChanged,
                        Err(_) => Event::RosterClosed,
                    },
                    delivery = next_delivery(&mut subscription) => Event::Delivery(delivery),
                };

                let Some(chat_id) = current.clone() else {
                    if let Event::RosterClosed = event {
                        return;
                    }
                    continue;
                };
                match event {
                    Event::SelectionChanged => continue,
                    Event::RosterClosed => return,
                    Event::Delivery(Some(Ok(snapshot))) => {
                        let messages = decode_messages(snapshot);
                        tx.send_modify(|log| *log = log.clone().apply_snapshot(&chat_id, messages));
                    }
                    Event::Delivery(Some(Err(e))) => {
                        error!("Failed to fetch messages of {chat_id}: {e}");
                        let message = format!("Failed to load messages: {e}");
                        tx.send_modify(|log| *log = log.clone().apply_error(&chat_id, message));
                    }
                    // ended after an error, wait for the next selection change
                    Event::Delivery(None) => subscription = None,
                }
            }
        });

        Self { state, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<MessageLog> {
        self.state.clone()
    }

    pub fn current(&self) -> MessageLog {
        self.state.borrow().clone()
    }
}

impl Drop for MessageSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}
