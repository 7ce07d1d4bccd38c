use crate::{
    configuration::Settings,
    modules::{auth::AuthRef, store::StoreRef, tokens::SessionTokens},
    utils::session::Sessions,
};
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(FromRef, Clone)]
pub struct AppState {
    pub store: StoreRef,
    pub auth: AuthRef,
    pub sessions: Arc<Sessions>,
    pub tokens: SessionTokens,
}

impl AppState {
    pub fn new(config: &Settings, store: StoreRef, auth: AuthRef) -> Self {
        AppState {
            sessions: Arc::new(Sessions::new(store.clone(), auth.clone())),
            tokens: SessionTokens::new(config.app.session_secret.clone(), &config.app.origin),
            store,
            auth,
        }
    }
}
