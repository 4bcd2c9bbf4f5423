use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{RwLock, broadcast, mpsc};

use crate::domain::store::{
    ChangeEvent, ChangeFeed, ChangeKind, Document, DocumentData, DocumentId, DocumentPatch,
    DocumentStore, QueryFilter, StoreError, apply_patch,
};

const CHANGES_CAPACITY: usize = 1024;

/// Process-local document store. Used when no database is configured and as
/// the stand-in store of the unit tests.
#[derive(Clone, Debug)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    changes: broadcast::Sender<ChangeEvent>,
    offline: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGES_CAPACITY);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            changes,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// While offline every operation fails as an unreachable backend would.
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Acquire) {
            Err(StoreError::Backend("document store is offline".to_owned()))
        } else {
            Ok(())
        }
    }

    fn notify(&self, collection: &str, id: &DocumentId, kind: ChangeKind) {
        // no receivers is fine
        let _ = self.changes.send(ChangeEvent::new(collection, id.clone(), kind));
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    async fn create_document(&self, collection: &str, data: DocumentData) -> Result<DocumentId, StoreError> {
        self.ensure_online()?;
        let id = DocumentId::generate();
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .push(Document { id: id.clone(), data });
        self.notify(collection, &id, ChangeKind::Created);
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &DocumentId,
        patch: DocumentPatch,
    ) -> Result<(), StoreError> {
        self.ensure_online()?;
        {
            let mut collections = self.collections.write().await;
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.iter_mut().find(|document| document.id == *id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            apply_patch(&mut document.data, &patch);
        }
        self.notify(collection, id, ChangeKind::Updated);
        Ok(())
    }

    async fn delete_document(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        self.ensure_online()?;
        let removed = {
            let mut collections = self.collections.write().await;
            match collections.get_mut(collection) {
                Some(documents) => {
                    let before = documents.len();
                    documents.retain(|document| document.id != *id);
                    documents.len() != before
                }
                None => false,
            }
        };
        if removed {
            self.notify(collection, id, ChangeKind::Deleted);
        }
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.iter().find(|document| document.id == *id))
            .cloned())
    }

    async fn query_documents(&self, collection: &str, filter: &QueryFilter) -> Result<Vec<Document>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(&document.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn watch(&self, collection: &str) -> Result<ChangeFeed, StoreError> {
        self.ensure_online()?;
        let mut changes = self.changes.subscribe();
        let (sender, receiver) = mpsc::unbounded_channel();
        let collection = collection.to_owned();

        let forwarder = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(event) if event.collection == collection => {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, %collection, "change feed lagged, requesting a resync");
                        if sender.send(ChangeEvent::resync(collection.as_str())).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(ChangeFeed::new(receiver, forwarder))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn data(value: Value) -> DocumentData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn crud_round() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .create_document("artists", data(json!({"name": "a"})))
            .await
            .unwrap();

        store
            .update_document("artists", &id, DocumentPatch::new().set("name", "b"))
            .await
            .unwrap();
        assert_eq!(
            store.get_document("artists", &id).await.unwrap().unwrap().data["name"],
            json!("b")
        );

        store.delete_document("artists", &id).await.unwrap();
        store.delete_document("artists", &id).await.unwrap();
        assert!(store.get_document("artists", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryDocumentStore::new();

        let result = store
            .update_document("artists", &DocumentId::new("nope"), DocumentPatch::new())
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn query_keeps_insertion_order() {
        let store = InMemoryDocumentStore::new();
        for name in ["c", "a", "b"] {
            store
                .create_document("artists", data(json!({"name": name, "createdBy": "u1"})))
                .await
                .unwrap();
        }
        store
            .create_document("artists", data(json!({"name": "z", "createdBy": "u2"})))
            .await
            .unwrap();

        let names = store
            .query_documents("artists", &QueryFilter::equals("createdBy", "u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|document| document.data["name"].clone())
            .collect::<Vec<_>>();

        assert_eq!(names, vec![json!("c"), json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn watch_only_sees_its_collection() {
        let store = InMemoryDocumentStore::new();
        let mut feed = store.watch("artists").await.unwrap();

        store.create_document("artistDrafts", DocumentData::new()).await.unwrap();
        let id = store.create_document("artists", DocumentData::new()).await.unwrap();
        store.delete_document("artists", &id).await.unwrap();

        let created = feed.next().await.unwrap();
        assert_eq!(created.document_id, Some(id));
        assert_eq!(created.kind, ChangeKind::Created);
        assert_eq!(feed.next().await.unwrap().kind, ChangeKind::Deleted);
    }

    #[tokio::test]
    async fn lagging_feed_asks_for_a_resync() {
        let store = InMemoryDocumentStore::new();
        let mut feed = store.watch("artists").await.unwrap();

        for _ in 0..CHANGES_CAPACITY + 10 {
            store.notify("artists", &DocumentId::generate(), ChangeKind::Updated);
        }

        let first = feed.next().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Resync);
        assert_eq!(first.document_id, None);
        assert_eq!(feed.next().await.unwrap().kind, ChangeKind::Updated);
    }
}
