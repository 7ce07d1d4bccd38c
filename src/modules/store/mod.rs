pub mod errors;
pub mod memory;
pub mod models;
pub mod paths;
pub mod query;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

pub use errors::StoreError;
pub use memory::MemoryStore;
pub use models::{to_document, Document, DocumentSnapshot, QuerySnapshot, SetMode, Timestamp};
pub use paths::{CollectionPath, DocPath};
pub use query::{Direction, Query};

/// Document database with live queries. Every live query delivers whole
/// snapshots; a later delivery supersedes everything delivered before it.
#[async_trait]
pub trait DocumentStore: 'static + Send + Sync {
    async fn get(&self, path: &DocPath) -> Result<Option<DocumentSnapshot>, StoreError>;

    async fn query(&self, query: &Query) -> Result<QuerySnapshot, StoreError>;

    async fn set(&self, path: &DocPath, data: Document, mode: SetMode) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, path: &DocPath, fields: Document) -> Result<(), StoreError>;

    async fn add(&self, collection: &CollectionPath, data: Document) -> Result<DocPath, StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    /// Must be called from within a tokio runtime.
    fn subscribe(&self, query: Query) -> Subscription;
}

pub type StoreRef = Arc<dyn DocumentStore>;

pub type Delivery = Result<QuerySnapshot, StoreError>;

/// Handle to a live query. Dropping it releases the query.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Delivery>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Delivery>, task: JoinHandle<()>) -> Self {
        Self { rx, task }
    }

    /// Waits for the next snapshot. `None` once the query has ended, which
    /// always follows an error delivery.
    pub async fn next(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
