use anyhow::Context;
use argon2::{hash_encoded, verify_encoded};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use nanoid::nanoid;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};
use validator::Validate;

use super::{AuthBackend, AuthError, FederatedIdentity, Principal, ProfileUpdate};
use crate::modules::store::Timestamp;

const MIN_PASSWORD_LENGTH: usize = 6;
const UID_LENGTH: usize = 28;

struct Account {
    principal: Principal,
    password_hash: Option<String>,
    providers: Vec<(String, String)>,
}

/// In-process account service with argon2 password hashes.
#[derive(Default)]
pub struct MemoryAuth {
    accounts: DashMap<String, Account>,
    emails: DashMap<String, String>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn uid_by_email(&self, email: &str) -> Option<String> {
        self.emails
            .get(&normalize_email(email))
            .map(|uid| uid.value().clone())
    }

    fn uid_by_provider(&self, provider: &str, subject: &str) -> Option<String> {
        self.accounts
            .iter()
            .find(|account| {
                account
                    .providers
                    .iter()
                    .any(|(p, s)| p == provider && s == subject)
            })
            .map(|account| account.key().clone())
    }

    fn insert_account(&self, account: Account) -> Result<Principal, AuthError> {
        let principal = account.principal.clone();
        match self.emails.entry(normalize_email(&principal.email)) {
            Entry::Occupied(_) => return Err(AuthError::EmailAlreadyInUse),
            Entry::Vacant(slot) => {
                slot.insert(principal.uid.clone());
            }
        }
        self.accounts.insert(principal.uid.clone(), account);
        trace!("Created account {}", principal.uid);
        Ok(principal)
    }
}

#[async_trait]
impl AuthBackend for MemoryAuth {
    async fn sign_up(&self, email: &str, password: SecretString) -> Result<Principal, AuthError> {
        let email = email.trim();
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        if !validator::validate_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        if self.uid_by_email(email).is_some() {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let now = Timestamp::now();
        self.insert_account(Account {
            principal: Principal {
                uid: nanoid!(UID_LENGTH),
                email: email.to_string(),
                display_name: None,
                photo_url: None,
                created_at: now,
                last_sign_in_time: now,
            },
            password_hash: Some(hash_pass(password)?),
            providers: Vec::new(),
        })
    }

    async fn sign_in(&self, email: &str, password: SecretString) -> Result<Principal, AuthError> {
        debug!("Verifying credentials");
        if email.trim().is_empty() || password.expose_secret().is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let uid = self
            .uid_by_email(email)
            .ok_or(AuthError::WrongCredentials)?;
        let mut account = self
            .accounts
            .get_mut(&uid)
            .ok_or(AuthError::WrongCredentials)?;

        let is_valid = match &account.password_hash {
            Some(hash) => verify_encoded(hash, password.expose_secret().as_bytes())
                .context("Failed to verify password")?,
            // federated-only accounts have no password
            None => false,
        };
        if !is_valid {
            return Err(AuthError::WrongCredentials);
        }

        account.principal.last_sign_in_time = Timestamp::now();
        Ok(account.principal.clone())
    }

    async fn sign_in_federated(&self, identity: FederatedIdentity) -> Result<Principal, AuthError> {
        if identity.provider.trim().is_empty() || identity.subject.trim().is_empty() {
            return Err(AuthError::MissingCredential);
        }
        identity.validate().map_err(|_| AuthError::InvalidEmail)?;

        let known = self
            .uid_by_provider(&identity.provider, &identity.subject)
            .or_else(|| self.uid_by_email(&identity.email));

        let Some(uid) = known else {
            let now = Timestamp::now();
            return self.insert_account(Account {
                principal: Principal {
                    uid: nanoid!(UID_LENGTH),
                    email: identity.email.trim().to_string(),
                    display_name: identity.display_name,
                    photo_url: identity.photo_url,
                    created_at: now,
                    last_sign_in_time: now,
                },
                password_hash: None,
                providers: vec![(identity.provider, identity.subject)],
            });
        };

        let mut account = self
            .accounts
            .get_mut(&uid)
            .ok_or(AuthError::UserNotFound)?;
        let link = (identity.provider, identity.subject);
        if !account.providers.contains(&link) {
            debug!("Linking {} to {uid}", link.0);
            account.providers.push(link);
        }
        if account.principal.display_name.is_none() {
            account.principal.display_name = identity.display_name;
        }
        if account.principal.photo_url.is_none() {
            account.principal.photo_url = identity.photo_url;
        }
        account.principal.last_sign_in_time = Timestamp::now();
        Ok(account.principal.clone())
    }

    async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<Principal, AuthError> {
        let update = update.normalized();
        let mut account = self.accounts.get_mut(uid).ok_or(AuthError::UserNotFound)?;
        account.principal.display_name = update.display_name;
        account.principal.photo_url = update.photo_url;
        Ok(account.principal.clone())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_pass(pass: SecretString) -> Result<String, AuthError> {
    Ok(hash_encoded(
        pass.expose_secret().as_bytes(),
        random_salt().as_bytes(),
        &argon2::Config::default(),
    )
    .context("Failed to hash pass")?)
}

fn random_salt() -> String {
    let mut rng = thread_rng();
    (0..16).map(|_| rng.sample(Alphanumeric) as char).collect()
}
