use anyhow::Context;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use std::sync::Arc;
use tracing::debug;

use crate::{
    modules::tokens::SESSION_COOKIE,
    state::AppState,
    utils::session::{errors::SessionError, SessionStore, Workspace},
};

/// The session the request's cookie points at. The principal may be signed
/// out.
pub struct ClientSession {
    pub sid: String,
    pub session: Arc<SessionStore>,
}

#[async_trait]
impl FromRequestParts<AppState> for ClientSession {
    type Rejection = SessionError;

    async fn from_request_parts(req: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(req, state)
            .await
            .context("Failed to fetch cookie jar")?;

        let cookie = jar.get(SESSION_COOKIE).ok_or(SessionError::SignedOut)?;
        let claims = state.tokens.validate(cookie).map_err(|_| {
            debug!("Rejected session cookie");
            SessionError::SignedOut
        })?;

        let session = state
            .sessions
            .get(&claims.sid)
            .ok_or(SessionError::SignedOut)?;
        Ok(Self {
            sid: claims.sid,
            session,
        })
    }
}

/// Workspace of the signed-in principal. Rejects signed-out sessions with a
/// redirect to the login route.
pub struct SignedIn(pub Arc<Workspace>);

#[async_trait]
impl FromRequestParts<AppState> for SignedIn {
    type Rejection = SessionError;

    async fn from_request_parts(req: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ClientSession { session, .. } = ClientSession::from_request_parts(req, state).await?;
        Ok(Self(session.workspace().await?))
    }
}
