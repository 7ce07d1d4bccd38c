
use chat_web::modules::store::{paths, to_document, DocumentStore, Query};
use chat_web::utils::{
    chats::{
        errors::ChatError,
        models::{ChatEdit, ChatRoom, NewChat, Selection},
        DEFAULT_COLOR, NO_SELECTION_NAME, PALETTE,
    },
    messages::models::{Message, SYSTEM_UID},
    session::errors::SessionError,
};
use serde_json::json;
use tools::{befriend, eventually, Backend, TestUser};

async fn read_room(backend: &Backend, id: &str) -> ChatRoom {
    backend
        .store
        .get(&paths::chat(id))
        .await
        .unwrap()
        .unwrap()
        .decode()
        .unwrap()
}

async fn stored_messages(backend: &Backend, id: &str) -> Vec<Message> {
    backend
        .store
        .query(&Query::new(paths::messages(id)))
        .await
        .unwrap()
        .docs
        .iter()
        .map(|doc| doc.decode().unwrap())
        .collect()
}

async fn wait_for_room(user: &TestUser, id: &str) -> ChatRoom {
    eventually(|| user.workspace.roster().room(id).cloned()).await
}

fn team(members: Vec<String>) -> NewChat {
    NewChat {
        name: "Team".into(),
        color: None,
        members,
    }
}

#[tokio::test]
async fn created_chat_reaches_every_member() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    befriend(&adam, &hubert).await;

    let id = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string()]))
        .await
        .unwrap();

    let room = read_room(&backend, &id).await;
    assert_eq!(room.name, "Team");
    assert_eq!(room.color.as_deref(), Some(PALETTE[0]));
    assert_eq!(room.created_by.as_deref(), Some(adam.uid()));
    assert_eq!(room.members, vec![adam.uid().to_string(), hubert.uid().to_string()]);

    // the creator lands in the new chat right away
    let selected = adam.workspace.selected_chat();
    assert_eq!(selected.selected_chat_id.as_deref(), Some(id.as_str()));
    assert_eq!(selected.selected_chat_name, "Team");
    assert_eq!(selected.selected_chat_color, PALETTE[0]);

    let listed = wait_for_room(&hubert, &id).await;
    assert_eq!(listed.display_name(hubert.uid()), "Team");

    let welcome: Vec<Message> = stored_messages(&backend, &id)
        .await
        .into_iter()
        .filter(|m| m.uid == SYSTEM_UID)
        .collect();
    assert_eq!(welcome.len(), 1);
    assert!(welcome[0].text.contains("\"Team\""));
    assert!(welcome[0].text.contains("Adam"));
}

#[tokio::test]
async fn create_rejects_blank_names_and_bad_colors() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;

    let res = adam
        .workspace
        .create_chat(NewChat {
            name: "   ".into(),
            color: None,
            members: vec![],
        })
        .await;
    match res {
        Err(SessionError::Chat(ChatError::EmptyName)) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let res = adam
        .workspace
        .create_chat(NewChat {
            name: "Team".into(),
            color: Some("blue".into()),
            members: vec![],
        })
        .await;
    match res {
        Err(SessionError::Chat(ChatError::InvalidColor(_))) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let chats = backend.store.query(&Query::new(paths::chats())).await.unwrap();
    assert!(chats.is_empty());
}

#[tokio::test]
async fn edit_updates_name_color_and_members() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    befriend(&adam, &hubert).await;
    let id = adam.workspace.create_chat(team(vec![])).await.unwrap();

    adam.workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: " Squad ".into(),
                color: Some("#DC2626".into()),
                members: vec![adam.uid().to_string(), hubert.uid().to_string()],
            },
        )
        .await
        .unwrap();

    let room = read_room(&backend, &id).await;
    assert_eq!(room.name, "Squad");
    assert_eq!(room.color.as_deref(), Some("#dc2626"));
    assert_eq!(room.members, vec![adam.uid().to_string(), hubert.uid().to_string()]);

    let listed = wait_for_room(&hubert, &id).await;
    assert_eq!(listed.name, "Squad");
}

#[tokio::test]
async fn editor_cannot_remove_themselves() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    befriend(&adam, &hubert).await;
    let id = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string()]))
        .await
        .unwrap();
    let before = read_room(&backend, &id).await;

    let res = adam
        .workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: "Renamed".into(),
                color: None,
                members: vec![hubert.uid().to_string()],
            },
        )
        .await;
    match res {
        Err(SessionError::Chat(ChatError::SelfRemoval)) => (),
        _ => panic!("Test result is {:?}", res),
    }

    assert_eq!(read_room(&backend, &id).await, before);
}

#[tokio::test]
async fn edit_requires_membership_and_existing_chat() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    let id = adam.workspace.create_chat(team(vec![])).await.unwrap();

    let res = hubert
        .workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: "Taken over".into(),
                color: None,
                members: vec![hubert.uid().to_string()],
            },
        )
        .await;
    match res {
        Err(SessionError::Chat(ChatError::NotMember)) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let res = adam
        .workspace
        .edit_chat(
            "missing",
            ChatEdit {
                name: "Team".into(),
                color: None,
                members: vec![adam.uid().to_string()],
            },
        )
        .await;
    match res {
        Err(SessionError::Chat(ChatError::ChatNotFound)) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let res = adam
        .workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: "".into(),
                color: None,
                members: vec![adam.uid().to_string()],
            },
        )
        .await;
    match res {
        Err(SessionError::Chat(ChatError::EmptyName)) => (),
        _ => panic!("Test result is {:?}", res),
    }

    let res = hubert.workspace.load_chat_for_edit(&id).await;
    match res {
        Err(SessionError::Chat(ChatError::NotMember)) => (),
        _ => panic!("Test result is {:?}", res),
    }
}

#[tokio::test]
async fn edit_form_resolves_member_names() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    befriend(&adam, &hubert).await;
    let id = adam
        .workspace
        .create_chat(NewChat {
            name: "Team".into(),
            color: Some("#16a34a".into()),
            members: vec![hubert.uid().to_string()],
        })
        .await
        .unwrap();
    // a member whose user record is gone
    backend
        .store
        .update(
            &paths::chat(&id),
            to_document(&json!({"members": [adam.uid(), hubert.uid(), "ghost"]})).unwrap(),
        )
        .await
        .unwrap();

    let form = adam.workspace.load_chat_for_edit(&id).await.unwrap();
    assert_eq!(form.id, id);
    assert_eq!(form.name, "Team");
    assert_eq!(form.color, "#16a34a");
    let names: Vec<&str> = form.members.iter().map(|m| m.display_name.as_str()).collect();
    assert_eq!(names, vec!["Adam", "Hubert", "[Unknown user]"]);
}

#[tokio::test]
async fn only_listed_chats_can_be_selected() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    let hidden = hubert.workspace.create_chat(team(vec![])).await.unwrap();

    let res = adam.workspace.select_chat(&hidden);
    match res {
        Err(SessionError::Chat(ChatError::ChatNotFound)) => (),
        _ => panic!("Test result is {:?}", res),
    }
    assert_eq!(adam.workspace.roster().selection, Selection::None);

    let first = adam.workspace.create_chat(team(vec![])).await.unwrap();
    let second = adam.workspace.create_chat(team(vec![])).await.unwrap();
    assert_eq!(adam.workspace.roster().selection, Selection::Chat(second));

    adam.workspace.select_chat(&first).unwrap();
    assert_eq!(adam.workspace.roster().selection, Selection::Chat(first));
}

#[tokio::test]
async fn selection_is_repaired_when_removed_from_chat() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;
    befriend(&adam, &hubert).await;

    assert_eq!(hubert.workspace.selected_chat().selected_chat_name, NO_SELECTION_NAME);

    let kept = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string()]))
        .await
        .unwrap();
    let dropped = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string()]))
        .await
        .unwrap();

    wait_for_room(&hubert, &kept).await;
    wait_for_room(&hubert, &dropped).await;
    hubert.workspace.select_chat(&dropped).unwrap();

    let only_adam = |name: &str| ChatEdit {
        name: name.into(),
        color: None,
        members: vec![adam.uid().to_string()],
    };

    adam.workspace
        .edit_chat(&dropped, only_adam("Dropped"))
        .await
        .unwrap();
    let roster = eventually(|| {
        let roster = hubert.workspace.roster();
        (roster.room(&dropped).is_none()).then_some(roster)
    })
    .await;
    assert_eq!(roster.selection, Selection::Chat(kept.clone()));
    assert_eq!(hubert.workspace.selected_chat().selected_chat_name, "Team");

    adam.workspace
        .edit_chat(&kept, only_adam("Kept"))
        .await
        .unwrap();
    let roster = eventually(|| {
        let roster = hubert.workspace.roster();
        roster.rooms.is_empty().then_some(roster)
    })
    .await;
    assert_eq!(roster.selection, Selection::None);

    let selected = hubert.workspace.selected_chat();
    assert_eq!(selected.selected_chat_id, None);
    assert_eq!(selected.selected_chat_name, NO_SELECTION_NAME);
    assert_eq!(selected.selected_chat_color, DEFAULT_COLOR);
}

#[tokio::test]
async fn roster_error_clears_rooms_and_selection() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    adam.workspace.create_chat(team(vec![])).await.unwrap();

    backend.store.deny("chats");

    let roster = eventually(|| {
        let roster = adam.workspace.roster();
        roster.error.is_some().then_some(roster)
    })
    .await;
    assert!(roster.rooms.is_empty());
    assert_eq!(roster.selection, Selection::None);
    assert!(roster.error.unwrap().starts_with("Failed to load chats"));
}

#[tokio::test]
async fn members_must_be_friends() {
    let backend = Backend::new();
    let adam = backend.user("adam@chat.com", "Adam").await;
    let hubert = backend.user("hubert@chat.com", "Hubert").await;

    let res = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string(), "ghost".into()]))
        .await;
    match res {
        Err(SessionError::Chat(ChatError::NotAFriend(_))) => (),
        _ => panic!("Test result is {:?}", res),
    }
    let chats = backend.store.query(&Query::new(paths::chats())).await.unwrap();
    assert!(chats.is_empty());

    befriend(&adam, &hubert).await;
    let id = adam
        .workspace
        .create_chat(team(vec![hubert.uid().to_string()]))
        .await
        .unwrap();

    let res = adam
        .workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: "Team".into(),
                color: None,
                members: vec![
                    adam.uid().to_string(),
                    hubert.uid().to_string(),
                    "ghost2".into(),
                ],
            },
        )
        .await;
    match res {
        Err(SessionError::Chat(ChatError::NotAFriend(uid))) => assert_eq!(uid, "ghost2"),
        _ => panic!("Test result is {:?}", res),
    }
    assert_eq!(
        read_room(&backend, &id).await.members,
        vec![adam.uid().to_string(), hubert.uid().to_string()]
    );

    // members that are no longer friends may stay
    adam.workspace.remove_friend(hubert.uid()).await.unwrap();
    eventually(|| {
        let view = adam.workspace.relationships();
        view.lists.accepted.is_empty().then_some(())
    })
    .await;
    adam.workspace
        .edit_chat(
            &id,
            ChatEdit {
                name: "Old team".into(),
                color: None,
                members: vec![adam.uid().to_string(), hubert.uid().to_string()],
            },
        )
        .await
        .unwrap();
    assert_eq!(read_room(&backend, &id).await.name, "Old team");
}
