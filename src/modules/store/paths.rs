use std::fmt::Display;

/// Slash separated path of a collection, e.g. `users/abc/friends`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn child(&self, name: &str) -> CollectionPath {
        CollectionPath(format!("{self}/{name}"))
    }
}

impl Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

pub fn users() -> CollectionPath {
    CollectionPath::root("users")
}

pub fn user(uid: &str) -> DocPath {
    users().doc(uid)
}

pub fn friends(uid: &str) -> CollectionPath {
    user(uid).child("friends")
}

/// Record of `other` kept under the namespace of `uid`.
pub fn friend(uid: &str, other: &str) -> DocPath {
    friends(uid).doc(other)
}

pub fn chats() -> CollectionPath {
    CollectionPath::root("chats")
}

pub fn chat(id: &str) -> DocPath {
    chats().doc(id)
}

pub fn messages(chat_id: &str) -> CollectionPath {
    chat(chat_id).child("messages")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_paths_render_with_slashes() {
        assert_eq!(friend("alice", "bob").to_string(), "users/alice/friends/bob");
        assert_eq!(messages("c1").to_string(), "chats/c1/messages");
        assert_eq!(friend("alice", "bob").collection(), &friends("alice"));
        assert_eq!(chat("c1").id(), "c1");
    }
}
