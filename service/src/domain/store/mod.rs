use std::fmt::{self, Display};
use std::future::Future;

use serde_json::{Map, Value};
use tokio::{sync::mpsc, task::JoinHandle};

pub mod patch;
pub mod query;

pub use patch::{DocumentPatch, apply_patch};
pub use query::QueryFilter;

/// Body of a stored document.
pub type DocumentData = Map<String, Value>;

/// Generic document database the core reads and writes through.
///
/// Implementations own id assignment and the change notifications; the
/// semantics of a patch are always those of [`apply_patch`].
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Stores a new document and returns the id assigned to it.
    fn create_document(
        &self,
        collection: &str,
        data: DocumentData,
    ) -> impl Future<Output = Result<DocumentId, StoreError>> + Send;

    /// Applies `patch` atomically. Fails with [`StoreError::NotFound`] when the
    /// document does not exist.
    fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removing a missing document is not an error.
    fn delete_document(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_document(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Documents matching `filter`, in insertion order.
    fn query_documents(
        &self,
        collection: &str,
        filter: &QueryFilter,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    /// Push subscription to every change in `collection`. Dropping the feed
    /// ends the subscription.
    fn watch(&self, collection: &str) -> impl Future<Output = Result<ChangeFeed, StoreError>> + Send;
}

// structs

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: DocumentData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    /// Changes may have been missed; the whole collection should be re-read.
    Resync,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: String,
    /// `None` for [`ChangeKind::Resync`]
    pub document_id: Option<DocumentId>,
    pub kind: ChangeKind,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {id} not found in {collection}")]
    NotFound { collection: String, id: DocumentId },
    #[error("document {id} in {collection} is malformed: {reason}")]
    Malformed {
        collection: String,
        id: DocumentId,
        reason: String,
    },
    #[error("document store failure: {0}")]
    Backend(String),
}

/// Receiving side of a [`DocumentStore::watch`] subscription.
pub struct ChangeFeed {
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    forwarder: Option<JoinHandle<()>>,
}

// implementations

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl ChangeEvent {
    pub fn new(collection: impl Into<String>, document_id: DocumentId, kind: ChangeKind) -> Self {
        Self {
            collection: collection.into(),
            document_id: Some(document_id),
            kind,
        }
    }

    pub fn resync(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document_id: None,
            kind: ChangeKind::Resync,
        }
    }
}

impl StoreError {
    pub fn not_found(collection: &str, id: &DocumentId) -> Self {
        Self::NotFound {
            collection: collection.to_owned(),
            id: id.clone(),
        }
    }

    pub fn backend(error: impl Display) -> Self {
        Self::Backend(error.to_string())
    }
}

impl ChangeFeed {
    /// `forwarder` is the task feeding `events`; it is aborted with the feed.
    pub fn new(events: mpsc::UnboundedReceiver<ChangeEvent>, forwarder: JoinHandle<()>) -> Self {
        Self {
            events,
            forwarder: Some(forwarder),
        }
    }

    /// Waits for the next change. `None` once the store side has gone away.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Discards every change already queued and returns how many there were.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.events.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }

    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
