pub mod errors;
pub mod models;

use anyhow::Context;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use self::{
    errors::ChatError,
    models::{
        ChatEdit, ChatEditForm, ChatMember, ChatRoom, NewChat, RosterState, SelectedChat,
        Selection,
    },
};
use crate::modules::{
    auth::Principal,
    store::{paths, to_document, DocumentStore, Query, StoreRef, Timestamp},
};
use crate::utils::{
    messages::models::Message,
    users::{models::UserRecord, UNKNOWN_USER},
};

/// Color of the message view when no chat, or a chat without a color, is selected.
pub const DEFAULT_COLOR: &str = "#60a5fa";

/// Colors offered by the create and edit forms. The first one is preselected.
pub const PALETTE: [&str; 14] = [
    "#2563eb", "#dc2626", "#16a34a", "#eab308", "#9333ea", "#ea580c", "#0ea5e9", "#f43f5e",
    "#be185d", "#7c2d12", "#6d28d9", "#0f766e", "#1e40af", "#a21caf",
];

pub const NO_SELECTION_NAME: &str = "Select a chat";
pub const NOT_FOUND_NAME: &str = "Chat not found";

impl ChatRoom {
    /// Name shown in the chat list. Unnamed chats are described by their members.
    pub fn display_name(&self, principal: &str) -> String {
        if !self.name.trim().is_empty() {
            return self.name.clone();
        }
        let others: Vec<&String> = self.members.iter().filter(|m| *m != principal).collect();
        match others.as_slice() {
            [] => "Unnamed chat".to_string(),
            [other] => {
                let short: String = other.chars().take(4).collect();
                format!("Chat with User {short}...")
            }
            many => format!("Chat with {} people", many.len()),
        }
    }

    pub fn color_or_default(&self) -> String {
        self.color
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }
}

impl RosterState {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            rooms: Vec::new(),
            selection: Selection::None,
            loaded: false,
            error: None,
        }
    }

    /// Replaces the roster and repairs the selection: a missing or stale
    /// selection moves to the first room, an empty roster clears it.
    pub fn apply_snapshot(self, rooms: Vec<ChatRoom>) -> Self {
        let selection = match (&self.selection, rooms.first()) {
            (_, None) => Selection::None,
            (Selection::Chat(id), Some(_)) if rooms.iter().any(|r| &r.id == id) => {
                self.selection.clone()
            }
            (_, Some(first)) => Selection::Chat(first.id.clone()),
        };

        Self {
            rooms,
            selection,
            loaded: true,
            error: None,
            ..self
        }
    }

    pub fn apply_error(self, message: String) -> Self {
        Self {
            rooms: Vec::new(),
            selection: Selection::None,
            loaded: true,
            error: Some(message),
            ..self
        }
    }

    /// Points the selection at `id` whether or not the roster lists it yet.
    pub fn select(self, id: &str) -> Self {
        Self {
            selection: Selection::Chat(id.to_string()),
            ..self
        }
    }

    pub fn room(&self, id: &str) -> Option<&ChatRoom> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn selected_chat(&self) -> SelectedChat {
        match &self.selection {
            Selection::None => SelectedChat {
                selected_chat_id: None,
                selected_chat_name: NO_SELECTION_NAME.to_string(),
                selected_chat_color: DEFAULT_COLOR.to_string(),
            },
            Selection::Chat(id) => match self.room(id) {
                Some(room) => SelectedChat {
                    selected_chat_id: Some(id.clone()),
                    selected_chat_name: room.display_name(&self.principal),
                    selected_chat_color: room.color_or_default(),
                },
                None => SelectedChat {
                    selected_chat_id: Some(id.clone()),
                    selected_chat_name: NOT_FOUND_NAME.to_string(),
                    selected_chat_color: DEFAULT_COLOR.to_string(),
                },
            },
        }
    }
}

/// Accepts `#rrggbb` in any case. A missing color picks the first palette entry.
pub fn validate_color(color: Option<&str>) -> Result<String, ChatError> {
    let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(PALETTE[0].to_string());
    };
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ChatError::InvalidColor(color.to_string()));
    }
    Ok(color.to_ascii_lowercase())
}

fn validate_name(name: &str) -> Result<String, ChatError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ChatError::EmptyName);
    }
    Ok(name.to_string())
}

/// Deduplicates while keeping the first occurrence of every uid.
fn unique_members<'a>(members: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for uid in members {
        let uid = uid.trim();
        if !uid.is_empty() && !unique.iter().any(|u| u == uid) {
            unique.push(uid.to_string());
        }
    }
    unique
}

/// Every member besides the principal must pass `allowed`.
fn check_members(
    members: &[String],
    principal: &str,
    allowed: impl Fn(&str) -> bool,
) -> Result<(), ChatError> {
    match members.iter().find(|m| *m != principal && !allowed(m)) {
        Some(stranger) => Err(ChatError::NotAFriend(stranger.clone())),
        None => Ok(()),
    }
}

/// Writes the room and its welcome message. Returns the new chat id.
/// `friends` are the principal's accepted friends, the only users that can
/// be picked as members.
pub async fn create_chat(
    store: &dyn DocumentStore,
    principal: &Principal,
    friends: &[String],
    chat: NewChat,
) -> Result<String, ChatError> {
    let name = validate_name(&chat.name)?;
    let color = validate_color(chat.color.as_deref())?;
    let members = unique_members(std::iter::once(&principal.uid).chain(chat.members.iter()));
    check_members(&members, &principal.uid, |uid| friends.iter().any(|f| f == uid))?;

    let room = ChatRoom {
        id: String::new(),
        name: name.clone(),
        color: Some(color),
        created_at: Some(Timestamp::now()),
        created_by: Some(principal.uid.clone()),
        members,
    };
    let path = store
        .add(
            &paths::chats(),
            to_document(&room).context("Failed to encode chat")?,
        )
        .await
        .context("Failed to create chat")?;
    let chat_id = path.id().to_string();

    let welcome = Message::system(format!(
        "Welcome to the chat \"{name}\"! Created by {}.",
        principal.resolved_name()
    ));
    store
        .add(
            &paths::messages(&chat_id),
            to_document(&welcome).context("Failed to encode welcome message")?,
        )
        .await
        .context("Failed to send welcome message")?;

    info!("Chat {chat_id} created by {}", principal.uid);
    Ok(chat_id)
}

async fn read_chat(store: &dyn DocumentStore, chat_id: &str) -> Result<ChatRoom, ChatError> {
    let doc = store
        .get(&paths::chat(chat_id))
        .await
        .context("Failed to select chat")?
        .ok_or(ChatError::ChatNotFound)?;
    let mut room: ChatRoom = doc.decode().context("Failed to decode chat")?;
    room.id = doc.id;
    Ok(room)
}

/// Overwrites name, color and members. The editor must stay a member and can
/// only add accepted friends; current members may stay.
pub async fn edit_chat(
    store: &dyn DocumentStore,
    principal: &str,
    friends: &[String],
    chat_id: &str,
    edit: ChatEdit,
) -> Result<(), ChatError> {
    let name = validate_name(&edit.name)?;
    let color = validate_color(edit.color.as_deref())?;
    let members = unique_members(edit.members.iter());
    if !members.iter().any(|m| m == principal) {
        return Err(ChatError::SelfRemoval);
    }

    let room = read_chat(store, chat_id).await?;
    if !room.members.iter().any(|m| m == principal) {
        return Err(ChatError::NotMember);
    }
    check_members(&members, principal, |uid| {
        friends.iter().chain(room.members.iter()).any(|m| m == uid)
    })?;

    let fields = json!({
        "name": name,
        "color": color,
        "members": members,
    });
    store
        .update(
            &paths::chat(chat_id),
            to_document(&fields).context("Failed to encode chat")?,
        )
        .await
        .context("Failed to update chat")?;

    debug!("Chat {chat_id} updated by {principal}");
    Ok(())
}

async fn member_name(store: &dyn DocumentStore, uid: &str) -> String {
    match store.get(&paths::user(uid)).await {
        Ok(Some(doc)) => doc
            .decode::<UserRecord>()
            .ok()
            .and_then(|user| user.resolved_name())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
        Ok(None) => UNKNOWN_USER.to_string(),
        Err(e) => {
            warn!("Failed to fetch member {uid}: {e}");
            UNKNOWN_USER.to_string()
        }
    }
}

/// Reads a chat for the edit form and resolves every member's display name.
pub async fn load_chat_for_edit(
    store: &dyn DocumentStore,
    principal: &Principal,
    chat_id: &str,
) -> Result<ChatEditForm, ChatError> {
    let room = read_chat(store, chat_id).await?;
    if !room.members.iter().any(|m| m == &principal.uid) {
        return Err(ChatError::NotMember);
    }

    let names = join_all(room.members.iter().map(|uid| async move {
        if uid == &principal.uid {
            principal.resolved_name()
        } else {
            member_name(store, uid).await
        }
    }))
    .await;

    let members = room
        .members
        .iter()
        .zip(names)
        .map(|(uid, display_name)| ChatMember {
            uid: uid.clone(),
            display_name,
        })
        .collect();

    Ok(ChatEditForm {
        color: room
            .color
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| PALETTE[0].to_string()),
        id: room.id,
        name: room.name,
        members,
    })
}

/// Live roster of the chats one principal belongs to, with the selected chat.
pub struct RosterSync {
    state: Arc<watch::Sender<RosterState>>,
    task: JoinHandle<()>,
}

impl RosterSync {
    pub fn spawn(store: StoreRef, principal: String) -> Self {
        let (tx, _) = watch::channel(RosterState::new(principal.clone()));
        let state = Arc::new(tx);
        let tx = state.clone();

        let task = tokio::spawn(async move {
            let query = Query::new(paths::chats()).array_contains("members", principal.as_str());
            let mut subscription = store.subscribe(query);
            debug!("Listening for chats of {principal}");

            while let Some(delivery) = subscription.next().await {
                match delivery {
                    Ok(snapshot) => {
                        let rooms: Vec<ChatRoom> = snapshot
                            .docs
                            .into_iter()
                            .filter_map(|doc| match doc.decode::<ChatRoom>() {
                                Ok(room) => Some(ChatRoom { id: doc.id, ..room }),
                                Err(e) => {
                                    warn!("Skipping unreadable chat: {e}");
                                    None
                                }
                            })
                            .collect();
                        tx.send_modify(|state| *state = state.clone().apply_snapshot(rooms));
                    }
                    Err(e) => {
                        error!("Failed to fetch chats of {principal}: {e}");
                        let message = format!("Failed to load chats: {e}");
                        tx.send_modify(|state| *state = state.clone().apply_error(message));
                    }
                }
            }
        });

        Self { state, task }
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> RosterState {
        self.state.borrow().clone()
    }

    pub fn select(&self, id: &str) {
        debug!("Selected chat {id}");
        self.state
            .send_modify(|state| *state = state.clone().select(id));
    }

    /// Selects a chat that was just written, once the roster lists it. Gives
    /// up when the roster fails, since the selection would be repaired away.
    pub async fn select_when_listed(&self, id: &str) {
        let mut rx = self.state.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if state.error.is_some() {
                    return;
                }
                if state.room(id).is_some() {
                    break;
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
        self.select(id);
    }
}

impl Drop for RosterSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn room(id: &str, name: &str) -> ChatRoom {
        ChatRoom {
            id: id.into(),
            name: name.into(),
            color: Some("#dc2626".into()),
            members: vec!["me".into(), "bob".into()],
            ..Default::default()
        }
    }

    #[test]
    fn first_snapshot_selects_first_room() {
        let state = RosterState::new("me").apply_snapshot(vec![room("a", "A"), room("b", "B")]);
        assert_eq!(state.selection, Selection::Chat("a".into()));
        let selected = state.selected_chat();
        assert_eq!(selected.selected_chat_name, "A");
        assert_eq!(selected.selected_chat_color, "#dc2626");
    }

    #[test]
    fn valid_selection_survives_snapshot() {
        let state = RosterState::new("me")
            .apply_snapshot(vec![room("a", "A"), room("b", "B")])
            .select("b")
            .apply_snapshot(vec![room("a", "A"), room("b", "Renamed")]);
        assert_eq!(state.selection, Selection::Chat("b".into()));
        assert_eq!(state.selected_chat().selected_chat_name, "Renamed");
    }

    #[test]
    fn stale_selection_moves_to_first_room() {
        let state = RosterState::new("me")
            .apply_snapshot(vec![room("a", "A"), room("b", "B")])
            .select("b")
            .apply_snapshot(vec![room("c", "C"), room("a", "A")]);
        assert_eq!(state.selection, Selection::Chat("c".into()));
    }

    #[test]
    fn empty_roster_clears_selection() {
        let state = RosterState::new("me")
            .apply_snapshot(vec![room("a", "A")])
            .apply_snapshot(Vec::new());
        assert_eq!(state.selection, Selection::None);
        let selected = state.selected_chat();
        assert_eq!(selected.selected_chat_name, NO_SELECTION_NAME);
        assert_eq!(selected.selected_chat_color, DEFAULT_COLOR);
    }

    #[test]
    fn unknown_selection_reads_not_found_until_next_snapshot() {
        let state = RosterState::new("me")
            .apply_snapshot(vec![room("a", "A")])
            .select("zzz");
        let selected = state.selected_chat();
        assert_eq!(selected.selected_chat_id.as_deref(), Some("zzz"));
        assert_eq!(selected.selected_chat_name, NOT_FOUND_NAME);
        assert_eq!(selected.selected_chat_color, DEFAULT_COLOR);
    }

    #[test]
    fn error_clears_roster_and_selection() {
        let state = RosterState::new("me")
            .apply_snapshot(vec![room("a", "A")])
            .apply_error("denied".into());
        assert!(state.rooms.is_empty());
        assert_eq!(state.selection, Selection::None);
        assert_eq!(state.error.as_deref(), Some("denied"));
    }

    #[test]
    fn unnamed_chats_are_described_by_members() {
        let mut chat = room("a", "  ");
        assert_eq!(chat.display_name("me"), "Chat with User bob...");
        chat.members.push("carol".into());
        assert_eq!(chat.display_name("me"), "Chat with 2 people");
        chat.members = vec!["me".into()];
        assert_eq!(chat.display_name("me"), "Unnamed chat");
    }

    #[test]
    fn colors_are_validated() {
        assert_eq!(validate_color(None).unwrap(), PALETTE[0]);
        assert_eq!(validate_color(Some("#A21CAF")).unwrap(), "#a21caf");
        assert!(matches!(
            validate_color(Some("blue")),
            Err(ChatError::InvalidColor(_))
        ));
        assert!(matches!(
            validate_color(Some("#12345g")),
            Err(ChatError::InvalidColor(_))
        ));
    }

    #[test]
    fn only_allowed_members_pass() {
        let members: Vec<String> = vec!["me".into(), "bob".into(), "eve".into()];
        assert!(check_members(&members, "me", |uid| uid == "bob" || uid == "eve").is_ok());
        assert!(matches!(
            check_members(&members, "me", |uid| uid == "bob"),
            Err(ChatError::NotAFriend(uid)) if uid == "eve"
        ));
    }

    #[test]
    fn members_keep_first_occurrence() {
        let input: Vec<String> = vec!["me".into(), "bob".into(), "me".into(), " ".into()];
        assert_eq!(unique_members(input.iter()), vec!["me", "bob"]);
    }
}
