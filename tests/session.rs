
use chat_web::modules::{
    auth::{AuthError, FederatedIdentity, ProfileUpdate},
    store::{paths, to_document, DocumentStore, SetMode},
};
use chat_web::utils::{
    session::{errors::SessionError, models::SessionState, spawn_sweeper, Sessions},
    users::{errors::UserError, models::UserRecord},
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use tokio::time::sleep;
use tools::{eventually, Backend, PASSWORD};

fn password() -> SecretString {
    SecretString::new(PASSWORD.into())
}

async fn user_record(backend: &Backend, uid: &str) -> UserRecord {
    backend
        .store
        .get(&paths::user(uid))
        .await
        .unwrap()
        .unwrap()
        .decode()
        .unwrap()
}

#[tokio::test]
async fn sign_up_writes_user_record() {
    let backend = Backend::new();
    let session = backend.session();

    let principal = session.sign_up("eve@chat.com", password()).await.unwrap();
    let workspace = session.workspace().await.unwrap();
    assert_eq!(workspace.uid(), principal.uid);

    let record = user_record(&backend, &principal.uid).await;
    assert_eq!(record.uid, principal.uid);
    assert_eq!(record.email.as_deref(), Some("eve@chat.com"));
    assert_eq!(record.display_name.as_deref(), Some("eve"));
    assert!(record.created_at.is_some());
    assert!(record.last_sign_in_time.is_some());
}

#[tokio::test]
async fn profile_update_merges_into_user_record() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;

    backend
        .store
        .set(
            &paths::user(adam.uid()),
            to_document(&json!({"bio": "likes rust"})).unwrap(),
            SetMode::Merge,
        )
        .await
        .unwrap();

    adam.session
        .update_profile(ProfileUpdate {
            display_name: Some("Adamus".into()),
            photo_url: Some("https://pics.chat.com/adam.png".into()),
        })
        .await
        .unwrap();

    let doc = backend
        .store
        .get(&paths::user(adam.uid()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.data.get("bio"), Some(&json!("likes rust")));
    assert_eq!(doc.data.get("displayName"), Some(&json!("Adamus")));
    assert_eq!(
        doc.data.get("photoURL"),
        Some(&json!("https://pics.chat.com/adam.png"))
    );
    assert_eq!(adam.workspace.principal().unwrap().resolved_name(), "Adamus");
}

#[tokio::test]
async fn sign_out_closes_workspace() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;

    adam.session.sign_out();

    let res = adam.session.workspace().await;
    match res {
        Err(SessionError::SignedOut) => (),
        _ => panic!("Test result is {:?}", res.map(|w| w.uid().to_string())),
    }
    let res = adam.workspace.principal();
    match res {
        Err(SessionError::SignedOut) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let rx = adam.session.subscribe();
    eventually(|| matches!(&*rx.borrow(), SessionState::SignedOut).then_some(())).await;

    let res = adam.workspace.send_message("still there?").await;
    match res {
        Err(SessionError::SignedOut) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn signing_in_as_someone_else_swaps_workspace() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;

    adam.session.sign_out();
    adam.session
        .sign_in("hubert@chat.com", password())
        .await
        .unwrap();

    let workspace = adam.session.workspace().await.unwrap();
    assert_eq!(workspace.uid(), hubert.uid());
    assert_eq!(workspace.principal().unwrap().resolved_name(), "Hubert");
}

#[tokio::test]
async fn wrong_password_keeps_session_signed_out() {
    let backend = Backend::new();
    backend.user("adam@chat.com", "Adam").await;
    let session = backend.session();

    let res = session
        .sign_in("adam@chat.com", SecretString::new("not-the-password".into()))
        .await;
    match res {
        Err(SessionError::Auth(AuthError::WrongCredentials)) => (),
        _ => panic!("Test result is {:?}", res),
    }
    match session.principal() {
        Err(SessionError::SignedOut) => (),
        other => panic!("Test result is {:?}", other),
    }
}

#[tokio::test]
async fn federated_sign_in_opens_workspace() {
    let backend = Backend::new();
    let session = backend.session();

    let principal = session
        .sign_in_federated(FederatedIdentity {
            provider: "google.com".into(),
            subject: "g-123".into(),
            email: "gina@chat.com".into(),
            display_name: Some("Gina".into()),
            photo_url: None,
        })
        .await
        .unwrap();

    let workspace = session.workspace().await.unwrap();
    assert_eq!(workspace.uid(), principal.uid);
    let record = user_record(&backend, &principal.uid).await;
    assert_eq!(record.display_name.as_deref(), Some("Gina"));
}

#[tokio::test]
async fn search_skips_self_and_related_users() {
    let backend = Backend::new();
    let hanna = backend.user("hanna@chat.com", "Hanna").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    let henry = backend.user("henry@chat.com", "Henry").await;

    hanna
        .workspace
        .send_friend_request(hubert.uid())
        .await
        .unwrap();
    eventually(|| (!hanna.workspace.relationships().lists.sent.is_empty()).then_some(())).await;

    let found = hanna.workspace.search_users("H").await.unwrap();
    let uids: Vec<&str> = found.iter().map(|u| u.uid.as_str()).collect();
    assert_eq!(uids, vec![henry.uid()]);
    assert_eq!(found[0].display_name, "Henry");

    // e-mail prefixes match too
    let found = hubert.workspace.search_users("henry@").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uid, henry.uid());

    let res = hanna.workspace.search_users("   ").await;
    match res {
        Err(SessionError::User(UserError::EmptySearch)) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

fn short_lived(backend: &Backend, millis: i64) -> Sessions {
    Sessions::with_lifetime(
        backend.store.clone(),
        backend.auth.clone(),
        time::Duration::milliseconds(millis),
    )
}

#[tokio::test]
async fn expired_sessions_are_swept() {
    let backend = Backend::new();
    let sessions = short_lived(&backend, 200);

    let (old_sid, old) = sessions.open();
    old.sign_up("adam@chat.com", password()).await.unwrap();
    sleep(std::time::Duration::from_millis(300)).await;
    let (fresh_sid, _) = sessions.open();

    // expired entries are not handed out before the sweep either
    assert!(sessions.get(&old_sid).is_none());
    assert_eq!(sessions.len(), 2);

    assert_eq!(sessions.sweep(), 1);
    assert_eq!(sessions.len(), 1);
    assert!(sessions.get(&fresh_sid).is_some());
    match old.principal() {
        Err(SessionError::SignedOut) => (),
        other => panic!("Test result is {:?}", other),
    }
    let rx = old.subscribe();
    assert!(matches!(&*rx.borrow(), SessionState::SignedOut));
}

#[tokio::test]
async fn renewed_session_outlives_its_first_expiry() {
    let backend = Backend::new();
    let sessions = short_lived(&backend, 200);

    let (sid, _) = sessions.open();
    sleep(std::time::Duration::from_millis(120)).await;
    sessions.renew(&sid);
    sleep(std::time::Duration::from_millis(120)).await;

    assert_eq!(sessions.sweep(), 0);
    assert!(sessions.get(&sid).is_some());
}

#[tokio::test]
async fn sweeper_closes_abandoned_sessions() {
    let backend = Backend::new();
    let sessions = Arc::new(short_lived(&backend, 50));
    let sweeper = spawn_sweeper(&sessions, std::time::Duration::from_millis(20));

    let opened: Vec<_> = (0..3).map(|_| sessions.open().1).collect();

    eventually(|| sessions.is_empty().then_some(())).await;
    for session in opened {
        assert!(matches!(&*session.subscribe().borrow(), SessionState::SignedOut));
    }
    sweeper.abort();
}
