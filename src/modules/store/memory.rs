use async_trait::async_trait;
use nanoid::nanoid;
use parking_lot::RwLock;
use std::collections::{hash_map::Entry, HashMap};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::{broadcast, broadcast::error::RecvError, mpsc};
use tracing::{debug, trace};

use super::{
    CollectionPath, DocPath, Document, DocumentSnapshot, DocumentStore, Query, QuerySnapshot,
    SetMode, StoreError, Subscription,
};

const DOCUMENT_ID_LENGTH: usize = 20;

#[derive(Debug, Clone)]
enum Change {
    Collection(CollectionPath),
    Rules,
}

struct Stored {
    seq: u64,
    data: Document,
}

struct Inner {
    docs: RwLock<HashMap<DocPath, Stored>>,
    denied: RwLock<Vec<String>>,
    seq: AtomicU64,
    changes: broadcast::Sender<Change>,
}

/// In-process document store. Cloning shares the same documents.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new(change_feed_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(change_feed_capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                docs: RwLock::new(HashMap::new()),
                denied: RwLock::new(Vec::new()),
                seq: AtomicU64::new(0),
                changes,
            }),
        }
    }

    /// Makes every read and write under `prefix` fail with
    /// [`StoreError::PermissionDenied`]. Live queries on it end with that error.
    pub fn deny(&self, prefix: impl Into<String>) {
        self.inner.denied.write().push(prefix.into());
        let _ = self.inner.changes.send(Change::Rules);
    }

    pub fn allow(&self, prefix: &str) {
        self.inner.denied.write().retain(|p| p != prefix);
        let _ = self.inner.changes.send(Change::Rules);
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        let denied = self.inner.denied.read();
        if denied.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Err(StoreError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn notify(&self, collection: &CollectionPath) {
        // no receivers just means no live queries
        let _ = self.inner.changes.send(Change::Collection(collection.clone()));
    }

    fn next_seq(&self) -> u64 {
        self.inner.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn run_query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.check(query.collection.as_str())?;

        let docs = self.inner.docs.read();
        let mut matching: Vec<(&DocPath, &Stored)> = docs
            .iter()
            .filter(|(path, entry)| {
                path.collection() == &query.collection && query.matches(&entry.data)
            })
            .collect();

        // Unordered queries come back in document id order, ordered ones fall
        // back to write order on ties.
        matching.sort_by(|(a_path, a), (b_path, b)| match query.order_by {
            Some(_) => query.compare(&a.data, &b.data).then(a.seq.cmp(&b.seq)),
            None => a_path.id().cmp(b_path.id()),
        });

        Ok(QuerySnapshot {
            docs: matching
                .into_iter()
                .map(|(path, entry)| DocumentSnapshot {
                    id: path.id().to_string(),
                    data: entry.data.clone(),
                })
                .collect(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<DocumentSnapshot>, StoreError> {
        self.check(&path.to_string())?;
        Ok(self.inner.docs.read().get(path).map(|entry| DocumentSnapshot {
            id: path.id().to_string(),
            data: entry.data.clone(),
        }))
    }

    async fn query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.run_query(query)
    }

    async fn set(&self, path: &DocPath, data: Document, mode: SetMode) -> Result<(), StoreError> {
        self.check(&path.to_string())?;
        {
            let mut docs = self.inner.docs.write();
            match docs.entry(path.clone()) {
                Entry::Occupied(mut stored) => match mode {
                    SetMode::Merge => stored.get_mut().data.extend(data),
                    SetMode::Overwrite => stored.get_mut().data = data,
                },
                Entry::Vacant(slot) => {
                    slot.insert(Stored {
                        seq: self.next_seq(),
                        data,
                    });
                }
            }
        }
        trace!("Set {path}");
        self.notify(path.collection());
        Ok(())
    }

    async fn update(&self, path: &DocPath, fields: Document) -> Result<(), StoreError> {
        self.check(&path.to_string())?;
        {
            let mut docs = self.inner.docs.write();
            let entry = docs
                .get_mut(path)
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            entry.data.extend(fields);
        }
        trace!("Updated {path}");
        self.notify(path.collection());
        Ok(())
    }

    async fn add(&self, collection: &CollectionPath, data: Document) -> Result<DocPath, StoreError> {
        self.check(collection.as_str())?;
        let path = collection.doc(nanoid!(DOCUMENT_ID_LENGTH));
        {
            let seq = self.next_seq();
            self.inner
                .docs
                .write()
                .insert(path.clone(), Stored { seq, data });
        }
        trace!("Added {path}");
        self.notify(collection);
        Ok(path)
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        self.check(&path.to_string())?;
        let removed = self.inner.docs.write().remove(path).is_some();
        if removed {
            trace!("Deleted {path}");
            self.notify(path.collection());
        }
        Ok(())
    }

    fn subscribe(&self, query: Query) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // registered before the first run so no change can slip in between
        let mut changes = self.inner.changes.subscribe();
        let store = self.clone();

        let task = tokio::spawn(async move {
            let mut last: Option<QuerySnapshot> = None;
            loop {
                match store.run_query(&query) {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            if tx.send(Ok(snapshot.clone())).is_err() {
                                return;
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        debug!("Live query on {} ended: {e}", query.collection);
                        let _ = tx.send(Err(e));
                        return;
                    }
                }

                loop {
                    match changes.recv().await {
                        Ok(Change::Collection(collection)) if collection != query.collection => {
                            continue
                        }
                        Ok(_) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            trace!("Live query lagged behind {skipped} changes");
                            break;
                        }
                        Err(RecvError::Closed) => return,
                    }
                }
            }
        });

        Subscription::new(rx, task)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::modules::store::{paths, Direction};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn next(sub: &mut Subscription) -> Result<QuerySnapshot, StoreError> {
        timeout(Duration::from_secs(2), sub.next())
            .await
            .expect("no delivery")
            .expect("subscription ended")
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields() {
        let store = MemoryStore::default();
        let path = paths::user("alice");
        store
            .set(&path, doc(json!({"email": "a@chat.com", "displayName": "A"})), SetMode::Overwrite)
            .await
            .unwrap();
        store
            .set(&path, doc(json!({"displayName": "Alice"})), SetMode::Merge)
            .await
            .unwrap();

        let data = store.get(&path).await.unwrap().unwrap().data;
        assert_eq!(data.get("email"), Some(&json!("a@chat.com")));
        assert_eq!(data.get("displayName"), Some(&json!("Alice")));
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryStore::default();
        let res = store
            .update(&paths::friend("a", "b"), doc(json!({"status": "accepted"})))
            .await;
        assert!(matches!(res, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn live_query_delivers_initial_and_changed_snapshots() {
        let store = MemoryStore::default();
        let collection = paths::messages("c1");
        let mut sub = store.subscribe(
            Query::new(collection.clone()).order_by("createdAt", Direction::Ascending),
        );

        assert!(next(&mut sub).await.unwrap().is_empty());

        store
            .add(&collection, doc(json!({"text": "second", "createdAt": 2})))
            .await
            .unwrap();
        assert_eq!(next(&mut sub).await.unwrap().len(), 1);

        store
            .add(&collection, doc(json!({"text": "first", "createdAt": 1})))
            .await
            .unwrap();
        let snapshot = next(&mut sub).await.unwrap();
        let texts: Vec<_> = snapshot.docs.iter().map(|d| d.data["text"].clone()).collect();
        assert_eq!(texts, vec![json!("first"), json!("second")]);
    }

    #[tokio::test]
    async fn writes_to_other_collections_are_not_delivered() {
        let store = MemoryStore::default();
        let mut sub = store.subscribe(Query::new(paths::messages("c1")));
        assert!(next(&mut sub).await.unwrap().is_empty());

        store
            .add(&paths::messages("c2"), doc(json!({"text": "elsewhere"})))
            .await
            .unwrap();
        store
            .add(&paths::messages("c1"), doc(json!({"text": "here"})))
            .await
            .unwrap();

        let snapshot = next(&mut sub).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].data["text"], json!("here"));
    }

    #[tokio::test]
    async fn denied_prefix_ends_live_query_with_error() {
        let store = MemoryStore::default();
        let mut sub = store.subscribe(Query::new(paths::friends("alice")));
        assert!(next(&mut sub).await.is_ok());

        store.deny("users/alice");
        assert!(matches!(
            next(&mut sub).await,
            Err(StoreError::PermissionDenied(_))
        ));
        assert!(sub.next().await.is_none());

        let write = store
            .set(&paths::friend("alice", "bob"), Document::new(), SetMode::Overwrite)
            .await;
        assert!(matches!(write, Err(StoreError::PermissionDenied(_))));

        store.allow("users/alice");
        assert!(store.get(&paths::friend("alice", "bob")).await.is_ok());
    }
}
