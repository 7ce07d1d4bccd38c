use axum::{debug_handler, extract::State, routing::post, Json, Router};
use axum_extra::extract::CookieJar;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

use crate::modules::{
    auth::{Credentials, FederatedIdentity, Principal},
    extractors::session::ClientSession,
    tokens::SessionTokens,
};
use crate::state::AppState;
use crate::utils::session::{errors::SessionError, SessionStore, Sessions};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(post_register_user))
        .route("/login", post(post_login_user))
        .route("/federated", post(post_federated_login))
        .route("/logout", post(post_user_logout))
}

/// Session to sign into: the one the cookie names, else a fresh one.
struct Target {
    sid: String,
    session: Arc<SessionStore>,
    fresh: bool,
}

impl Target {
    fn new(sessions: &Sessions, existing: Option<ClientSession>) -> Self {
        match existing {
            Some(ClientSession { sid, session }) => Self {
                sid,
                session,
                fresh: false,
            },
            None => {
                let (sid, session) = sessions.open();
                Self {
                    sid,
                    session,
                    fresh: true,
                }
            }
        }
    }

    /// Sets the cookie on success. A fresh session that failed to sign in is
    /// closed again.
    fn finish(
        self,
        sessions: &Sessions,
        tokens: &SessionTokens,
        jar: CookieJar,
        res: Result<Principal, SessionError>,
    ) -> Result<(CookieJar, Json<Principal>), SessionError> {
        match res {
            Ok(principal) => {
                let cookie = tokens.create_cookie(&self.sid)?;
                sessions.renew(&self.sid);
                debug!("Session {} signed in as {}", self.sid, principal.uid);
                Ok((jar.add(cookie), Json(principal)))
            }
            Err(e) => {
                if self.fresh {
                    sessions.close(&self.sid);
                }
                Err(e)
            }
        }
    }
}

#[debug_handler(state = AppState)]
async fn post_register_user(
    State(sessions): State<Arc<Sessions>>,
    State(tokens): State<SessionTokens>,
    existing: Option<ClientSession>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<Principal>), SessionError> {
    let target = Target::new(&sessions, existing);
    let res = target
        .session
        .sign_up(&credentials.email, SecretString::new(credentials.password))
        .await;
    target.finish(&sessions, &tokens, jar, res)
}

#[debug_handler(state = AppState)]
async fn post_login_user(
    State(sessions): State<Arc<Sessions>>,
    State(tokens): State<SessionTokens>,
    existing: Option<ClientSession>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<Principal>), SessionError> {
    let target = Target::new(&sessions, existing);
    let res = target
        .session
        .sign_in(&credentials.email, SecretString::new(credentials.password))
        .await;
    target.finish(&sessions, &tokens, jar, res)
}

#[debug_handler(state = AppState)]
async fn post_federated_login(
    State(sessions): State<Arc<Sessions>>,
    State(tokens): State<SessionTokens>,
    existing: Option<ClientSession>,
    jar: CookieJar,
    Json(identity): Json<FederatedIdentity>,
) -> Result<(CookieJar, Json<Principal>), SessionError> {
    let target = Target::new(&sessions, existing);
    let res = target.session.sign_in_federated(identity).await;
    target.finish(&sessions, &tokens, jar, res)
}

#[debug_handler(state = AppState)]
async fn post_user_logout(
    State(sessions): State<Arc<Sessions>>,
    session: ClientSession,
    jar: CookieJar,
) -> CookieJar {
    sessions.close(&session.sid);
    jar.remove(SessionTokens::removal_cookie())
}
