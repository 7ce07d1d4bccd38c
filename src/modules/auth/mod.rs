pub mod errors;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

pub use errors::AuthError;
pub use memory::MemoryAuth;
pub use models::{Credentials, FederatedIdentity, Principal, ProfileUpdate};

/// Account service shared by every client.
#[async_trait]
pub trait AuthBackend: 'static + Send + Sync {
    async fn sign_up(&self, email: &str, password: SecretString) -> Result<Principal, AuthError>;

    async fn sign_in(&self, email: &str, password: SecretString) -> Result<Principal, AuthError>;

    async fn sign_in_federated(&self, identity: FederatedIdentity) -> Result<Principal, AuthError>;

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<Principal, AuthError>;
}

pub type AuthRef = Arc<dyn AuthBackend>;

/// One client's view of the auth backend: who is signed in right now, as a
/// stream of principal changes.
pub struct AuthSession {
    backend: AuthRef,
    principal: watch::Sender<Option<Principal>>,
}

impl AuthSession {
    pub fn new(backend: AuthRef) -> Self {
        let (principal, _) = watch::channel(None);
        Self { backend, principal }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.principal.subscribe()
    }

    pub fn current(&self) -> Option<Principal> {
        self.principal.borrow().clone()
    }

    pub async fn sign_up(&self, email: &str, password: SecretString) -> Result<Principal, AuthError> {
        let principal = self.backend.sign_up(email, password).await?;
        info!("Registered {}", principal.uid);
        Ok(self.replace(principal))
    }

    pub async fn sign_in(&self, email: &str, password: SecretString) -> Result<Principal, AuthError> {
        let principal = self.backend.sign_in(email, password).await?;
        info!("Signed in {}", principal.uid);
        Ok(self.replace(principal))
    }

    pub async fn sign_in_federated(
        &self,
        identity: FederatedIdentity,
    ) -> Result<Principal, AuthError> {
        let principal = self.backend.sign_in_federated(identity).await?;
        info!("Signed in {} through a federated provider", principal.uid);
        Ok(self.replace(principal))
    }

    pub fn sign_out(&self) {
        if let Some(principal) = self.principal.send_replace(None) {
            info!("Signed out {}", principal.uid);
        }
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Principal, AuthError> {
        let uid = self.current().ok_or(AuthError::NotSignedIn)?.uid;
        let principal = self.backend.update_profile(&uid, update).await?;
        debug!("Updated profile of {uid}");
        Ok(self.replace(principal))
    }

    fn replace(&self, principal: Principal) -> Principal {
        self.principal.send_replace(Some(principal.clone()));
        principal
    }
}
