pub mod errors;
pub mod models;
pub mod workspace;

use dashmap::DashMap;
use secrecy::SecretString;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};
use uuid::Uuid;

pub use self::workspace::{Workspace, WorkspaceWatch};
use self::{errors::SessionError, models::SessionState};
use crate::modules::{
    auth::{AuthRef, AuthSession, FederatedIdentity, Principal, ProfileUpdate},
    store::StoreRef,
    tokens::SESSION_DURATION,
};
use crate::utils::users::{self, upsert_user_document};

/// One client's session: follows the principal stream, keeps the user record
/// current and owns the workspace of whoever is signed in.
pub struct SessionStore {
    auth: AuthSession,
    store: StoreRef,
    state: Arc<watch::Sender<SessionState>>,
    task: JoinHandle<()>,
}

impl SessionStore {
    /// Must be called from within a tokio runtime.
    pub fn new(store: StoreRef, auth: AuthRef) -> Self {
        let auth = AuthSession::new(auth);
        let (tx, _) = watch::channel(SessionState::Loading);
        let state = Arc::new(tx);
        let task = tokio::spawn(track_principal(
            store.clone(),
            auth.subscribe(),
            state.clone(),
        ));

        Self {
            auth,
            store,
            state,
            task,
        }
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn principal(&self) -> Result<Principal, SessionError> {
        self.auth.current().ok_or(SessionError::SignedOut)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Workspace of the signed-in principal, waiting for it to be built when
    /// the principal just changed.
    pub async fn workspace(&self) -> Result<Arc<Workspace>, SessionError> {
        let mut rx = self.state.subscribe();
        loop {
            let principal = self.principal()?;
            let ready = match &*rx.borrow_and_update() {
                SessionState::SignedIn(workspace) if workspace.uid() == principal.uid => {
                    Some(workspace.clone())
                }
                _ => None,
            };
            if let Some(workspace) = ready {
                return Ok(workspace);
            }
            if rx.changed().await.is_err() {
                return Err(SessionError::SignedOut);
            }
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<Principal, SessionError> {
        let principal = self.auth.sign_up(email, password).await?;
        self.workspace().await?;
        Ok(principal)
    }

    pub async fn sign_in(
        &self,
        email: &str,
        password: SecretString,
    ) -> Result<Principal, SessionError> {
        let principal = self.auth.sign_in(email, password).await?;
        self.workspace().await?;
        Ok(principal)
    }

    pub async fn sign_in_federated(
        &self,
        identity: FederatedIdentity,
    ) -> Result<Principal, SessionError> {
        let principal = self.auth.sign_in_federated(identity).await?;
        self.workspace().await?;
        Ok(principal)
    }

    pub fn sign_out(&self) {
        self.auth.sign_out();
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Principal, SessionError> {
        Ok(users::update_profile(&self.auth, self.store.as_ref(), update).await?)
    }

    /// Stops following the principal and drops the workspace.
    pub fn shutdown(&self) {
        self.task.abort();
        self.state.send_replace(SessionState::SignedOut);
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn track_principal(
    store: StoreRef,
    mut principal_rx: watch::Receiver<Option<Principal>>,
    state: Arc<watch::Sender<SessionState>>,
) {
    let mut current: Option<String> = None;
    loop {
        let principal = principal_rx.borrow_and_update().clone();
        match principal {
            Some(principal) => {
                if let Err(e) = upsert_user_document(store.as_ref(), &principal).await {
                    error!("Failed to upsert user record of {}: {e}", principal.uid);
                }
                if current.as_deref() != Some(principal.uid.as_str()) {
                    // the previous workspace goes before the next one starts
                    state.send_replace(SessionState::Loading);
                    let workspace =
                        Workspace::new(store.clone(), &principal.uid, principal_rx.clone());
                    info!("Workspace ready for {}", principal.uid);
                    current = Some(principal.uid);
                    state.send_replace(SessionState::SignedIn(Arc::new(workspace)));
                }
            }
            None => {
                if let Some(uid) = current.take() {
                    info!("Workspace of {uid} closed");
                }
                state.send_replace(SessionState::SignedOut);
            }
        }

        if principal_rx.changed().await.is_err() {
            debug!("Principal stream closed");
            return;
        }
    }
}

struct Entry {
    session: Arc<SessionStore>,
    expires_at: OffsetDateTime,
}

/// Session stores of every connected client, keyed by session id. Entries
/// live as long as the cookie issued for them.
pub struct Sessions {
    store: StoreRef,
    auth: AuthRef,
    lifetime: Duration,
    sessions: DashMap<String, Entry>,
}

impl Sessions {
    pub fn new(store: StoreRef, auth: AuthRef) -> Self {
        Self::with_lifetime(store, auth, SESSION_DURATION)
    }

    pub fn with_lifetime(store: StoreRef, auth: AuthRef, lifetime: Duration) -> Self {
        Self {
            store,
            auth,
            lifetime,
            sessions: DashMap::new(),
        }
    }

    pub fn open(&self) -> (String, Arc<SessionStore>) {
        let sid = Uuid::new_v4().to_string();
        let session = Arc::new(SessionStore::new(self.store.clone(), self.auth.clone()));
        self.sessions.insert(
            sid.clone(),
            Entry {
                session: session.clone(),
                expires_at: OffsetDateTime::now_utc() + self.lifetime,
            },
        );
        debug!("Opened session {sid}");
        (sid, session)
    }

    /// Expired sessions are not handed out, even before the next sweep.
    pub fn get(&self, sid: &str) -> Option<Arc<SessionStore>> {
        self.sessions
            .get(sid)
            .filter(|entry| entry.expires_at > OffsetDateTime::now_utc())
            .map(|entry| entry.session.clone())
    }

    /// Restarts the lifetime of a session that was just issued a new cookie.
    pub fn renew(&self, sid: &str) {
        if let Some(mut entry) = self.sessions.get_mut(sid) {
            entry.expires_at = OffsetDateTime::now_utc() + self.lifetime;
        }
    }

    pub fn close(&self, sid: &str) {
        if let Some((_, entry)) = self.sessions.remove(sid) {
            retire(&entry.session);
            debug!("Closed session {sid}");
        }
    }

    /// Closes every session past its expiry and returns how many went.
    pub fn sweep(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.expires_at <= now)
            .map(|entry| entry.key().clone())
            .collect();

        let closed = expired
            .iter()
            .filter_map(|sid| self.sessions.remove_if(sid, |_, entry| entry.expires_at <= now))
            .map(|(_, entry)| retire(&entry.session))
            .count();
        if closed > 0 {
            info!("Closed {closed} expired sessions");
        }
        closed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn retire(session: &SessionStore) {
    session.sign_out();
    session.shutdown();
}

/// Sweeps expired sessions every `period` until the registry is dropped.
pub fn spawn_sweeper(sessions: &Arc<Sessions>, period: std::time::Duration) -> JoinHandle<()> {
    let sessions = Arc::downgrade(sessions);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let Some(sessions) = sessions.upgrade() else {
                return;
            };
            sessions.sweep();
        }
    })
}
