use std::{collections::HashMap, future::Future, sync::Arc};

use chrono::Utc;
use serde_json::Value;
use spins_common::{
    Artist, ArtistSubmission, CREATED_BY_FIELD_NAME, CREATED_FIELD_NAME, CREATOR_NAME_FIELD_NAME,
    DRAFTS_COLLECTION, Draft, DraftId, UPDATED_FIELD_NAME, UserId, prepare_draft, sort_by_recency,
};
use tokio::sync::RwLock;

use crate::domain::{
    catalog::timestamp,
    error::CatalogError,
    store::{Document, DocumentData, DocumentId, DocumentPatch, DocumentStore, QueryFilter, StoreError},
};

const DRAFT: &str = "draft";

/// Persists "save for later" submissions and turns them into artists.
///
/// The per-user cache mirrors the last successful listing and is only
/// changed after the store confirmed a write.
#[derive(Clone)]
pub struct DraftLifecycle<S> {
    store: S,
    cache: Arc<RwLock<HashMap<UserId, Vec<Draft>>>>,
}

impl<S: DocumentStore> DraftLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn save_draft(&self, data: &ArtistSubmission) -> Result<Draft, CatalogError> {
        let content = prepare_draft(data);
        let now = timestamp(Utc::now());
        let mut body = encode(&content)?;
        body.insert(CREATED_FIELD_NAME.to_owned(), now.clone());
        body.insert(UPDATED_FIELD_NAME.to_owned(), now);

        let id = self
            .store
            .create_document(DRAFTS_COLLECTION, body.clone())
            .await
            .map_err(CatalogError::remote("save draft", DRAFT))?;
        tracing::debug!(draft_id = %id, "draft saved");

        let draft = draft_from(Document { id, data: body }).map_err(CatalogError::remote("save draft", DRAFT))?;
        self.cache_upsert(&draft).await;
        Ok(draft)
    }

    /// Stores the resumed edit of a draft and refreshes its `updatedAt`.
    /// An edit naming no creator keeps the stored one.
    pub async fn update_draft(&self, id: &DraftId, data: &ArtistSubmission) -> Result<Draft, CatalogError> {
        let document_id = DocumentId::new(id.as_str());
        let mut body = encode(&prepare_draft(data))?;
        if data.created_by.as_deref().is_none_or(|user| user.trim().is_empty()) {
            body.remove(CREATED_BY_FIELD_NAME);
            body.remove(CREATOR_NAME_FIELD_NAME);
        }
        body.insert(UPDATED_FIELD_NAME.to_owned(), timestamp(Utc::now()));

        self.store
            .update_document(DRAFTS_COLLECTION, &document_id, DocumentPatch::merge(body))
            .await
            .map_err(CatalogError::remote("update draft", DRAFT))?;
        tracing::debug!(draft_id = %id, "draft updated");

        let draft = self.get_draft(id).await?;
        self.cache_upsert(&draft).await;
        Ok(draft)
    }

    pub async fn get_draft(&self, id: &DraftId) -> Result<Draft, CatalogError> {
        let document = self
            .store
            .get_document(DRAFTS_COLLECTION, &DocumentId::new(id.as_str()))
            .await
            .map_err(CatalogError::remote("load draft", DRAFT))?
            .ok_or_else(|| CatalogError::not_found(DRAFT, id))?;

        draft_from(document).map_err(CatalogError::remote("load draft", DRAFT))
    }

    /// Drafts of `user_id`, most recently updated first.
    pub async fn list_drafts(&self, user_id: &UserId) -> Result<Vec<Draft>, CatalogError> {
        let documents = self
            .store
            .query_documents(
                DRAFTS_COLLECTION,
                &QueryFilter::equals(CREATED_BY_FIELD_NAME, user_id.as_ref()),
            )
            .await
            .map_err(CatalogError::remote("list drafts", DRAFT))?;

        let mut drafts = documents
            .into_iter()
            .filter_map(|document| match draft_from(document) {
                Ok(draft) => Some(draft),
                Err(error) => {
                    tracing::warn!(%error, "skipping unreadable draft");
                    None
                }
            })
            .collect::<Vec<_>>();
        sort_by_recency(&mut drafts);

        self.cache.write().await.insert(user_id.clone(), drafts.clone());
        Ok(drafts)
    }

    /// Last listing of `user_id`, if any.
    pub async fn cached_drafts(&self, user_id: &UserId) -> Option<Vec<Draft>> {
        self.cache.read().await.get(user_id).cloned()
    }

    /// [`Self::list_drafts`], answered from the last listing while the store
    /// is unreachable.
    pub async fn list_drafts_or_cached(&self, user_id: &UserId) -> Result<Vec<Draft>, CatalogError> {
        match self.list_drafts(user_id).await {
            Err(error @ CatalogError::Remote { .. }) => match self.cached_drafts(user_id).await {
                Some(drafts) => {
                    tracing::warn!(%error, %user_id, "serving cached drafts");
                    Ok(drafts)
                }
                None => Err(error),
            },
            result => result,
        }
    }

    pub async fn delete_draft(&self, id: &DraftId) -> Result<(), CatalogError> {
        self.store
            .delete_document(DRAFTS_COLLECTION, &DocumentId::new(id.as_str()))
            .await
            .map_err(CatalogError::remote("delete draft", DRAFT))?;
        tracing::debug!(draft_id = %id, "draft deleted");

        for drafts in self.cache.write().await.values_mut() {
            drafts.retain(|draft| draft.id != *id);
        }
        Ok(())
    }

    /// Publishes a draft with `publish`, then deletes it.
    ///
    /// The two steps are not atomic. When the deletion fails the artist stays
    /// published and [`CatalogError::PartialFailure`] reports the orphaned
    /// draft.
    pub async fn promote<F, Fut>(&self, draft: &Draft, publish: F) -> Result<Artist, CatalogError>
    where
        F: FnOnce(ArtistSubmission) -> Fut,
        Fut: Future<Output = Result<Artist, CatalogError>>,
    {
        let artist = publish(draft.content.clone()).await?;

        match self.delete_draft(&draft.id).await {
            Ok(()) => {
                tracing::debug!(draft_id = %draft.id, artist_id = %artist.id, "draft promoted");
                Ok(artist)
            }
            Err(error) => {
                tracing::warn!(%error, draft_id = %draft.id, artist_id = %artist.id, "draft published but not deleted");
                Err(CatalogError::PartialFailure {
                    artist: Box::new(artist),
                    draft_id: draft.id.clone(),
                    source: Box::new(error),
                })
            }
        }
    }

    /// Moves `draft` to its owner's listing, which may differ from the
    /// listing it was cached in before.
    async fn cache_upsert(&self, draft: &Draft) {
        let mut cache = self.cache.write().await;
        for drafts in cache.values_mut() {
            drafts.retain(|cached| cached.id != draft.id);
        }
        if let Some(drafts) = cache.get_mut(&draft.owner()) {
            drafts.push(draft.clone());
            sort_by_recency(drafts);
        }
    }
}

fn draft_from(document: Document) -> Result<Draft, StoreError> {
    let Document { id, data } = document;
    Draft::from_document(DraftId::new(id.as_str()), data).map_err(|error| StoreError::Malformed {
        collection: DRAFTS_COLLECTION.to_owned(),
        id,
        reason: error.to_string(),
    })
}

fn encode(content: &ArtistSubmission) -> Result<DocumentData, CatalogError> {
    match serde_json::to_value(content) {
        Ok(Value::Object(body)) => Ok(body),
        Ok(_) => Err(CatalogError::Remote {
            operation: "encode draft",
            source: StoreError::Backend("draft is not an object".to_owned()),
        }),
        Err(error) => Err(CatalogError::Remote {
            operation: "encode draft",
            source: StoreError::backend(error),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, SecondsFormat};
    use serde_json::json;
    use spins_common::test_utils::submission;

    use super::*;
    use crate::infrastructure::memory::InMemoryDocumentStore;

    fn user(id: &str) -> UserId {
        UserId::or_anonymous(Some(id))
    }

    async fn publish_ok(content: ArtistSubmission) -> Result<Artist, CatalogError> {
        let record = spins_common::normalize(&content)?;
        Ok(Artist {
            id: spins_common::ArtistId::new("published"),
            record,
            saved_by: Default::default(),
            created_at: None,
            updated_at: None,
        })
    }

    #[tokio::test]
    async fn saved_draft_is_prepared_and_listed() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());

        let draft = drafts
            .save_draft(&ArtistSubmission {
                name: Some(" ".to_owned()),
                created_by: Some("u1".to_owned()),
                ..ArtistSubmission::default()
            })
            .await
            .unwrap();

        assert_eq!(draft.content.name.as_deref(), Some("Untitled Artist"));
        assert!(draft.updated_at.is_some());
        assert_eq!(drafts.list_drafts(&user("u1")).await.unwrap(), vec![draft]);
        assert!(drafts.list_drafts(&user("u2")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_orders_by_updated_at_descending() {
        let store = InMemoryDocumentStore::new();
        let drafts = DraftLifecycle::new(store.clone());
        let now = Utc::now();
        for (name, hours) in [("t-3", 3), ("t-1", 1), ("t-2", 2)] {
            let at = (now - Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Millis, true);
            let body = json!({"name": name, "createdBy": "u1", "updatedAt": at});
            let Value::Object(body) = body else { unreachable!() };
            store.create_document(DRAFTS_COLLECTION, body).await.unwrap();
        }

        let names = drafts
            .list_drafts(&user("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|draft| draft.content.name.unwrap_or_default())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["t-1", "t-2", "t-3"]);
    }

    #[tokio::test]
    async fn update_refreshes_draft_and_cache() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());
        let older = drafts.save_draft(&submission("Older", "u1")).await.unwrap();
        let newer = drafts.save_draft(&submission("Newer", "u1")).await.unwrap();
        drafts.list_drafts(&user("u1")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let edit = ArtistSubmission {
            created_by: None,
            ..submission("Older, edited", "u1")
        };
        let resumed = drafts.update_draft(&older.id, &edit).await.unwrap();

        assert_eq!(resumed.content.name.as_deref(), Some("Older, edited"));
        assert_eq!(resumed.owner(), user("u1"));
        let cached = drafts.cached_drafts(&user("u1")).await.unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[0].id, older.id);
        assert_eq!(cached[1].id, newer.id);
    }

    #[tokio::test]
    async fn updating_a_missing_draft_is_not_found() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());

        let result = drafts
            .update_draft(&DraftId::new("gone"), &submission("x", "u1"))
            .await;

        assert!(matches!(result, Err(CatalogError::NotFound { entity: "draft", .. })));
    }

    #[tokio::test]
    async fn promote_deletes_the_draft() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());
        let draft = drafts.save_draft(&submission("Boards", "u1")).await.unwrap();
        drafts.list_drafts(&user("u1")).await.unwrap();

        let artist = drafts.promote(&draft, publish_ok).await.unwrap();

        assert_eq!(artist.record.name, "Boards");
        assert!(drafts.list_drafts(&user("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_publish_keeps_the_draft() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());
        let draft = drafts
            .save_draft(&ArtistSubmission {
                created_by: Some("u1".to_owned()),
                ..ArtistSubmission::default()
            })
            .await
            .unwrap();

        let result = drafts.promote(&draft, publish_ok).await;

        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert_eq!(drafts.list_drafts(&user("u1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_after_publish_is_a_partial_failure() {
        let store = InMemoryDocumentStore::new();
        let drafts = DraftLifecycle::new(store.clone());
        let draft = drafts.save_draft(&submission("Boards", "u1")).await.unwrap();
        drafts.list_drafts(&user("u1")).await.unwrap();

        let result = drafts
            .promote(&draft, |content| {
                let store = store.clone();
                async move {
                    let artist = publish_ok(content).await;
                    store.set_offline(true);
                    artist
                }
            })
            .await;

        match result {
            Err(CatalogError::PartialFailure { artist, draft_id, .. }) => {
                assert_eq!(artist.record.name, "Boards");
                assert_eq!(draft_id, draft.id);
            }
            other => panic!("expected a partial failure, got {other:?}"),
        }
        assert_eq!(drafts.cached_drafts(&user("u1")).await.unwrap(), vec![draft]);
    }

    #[tokio::test]
    async fn changing_the_creator_moves_the_cached_draft() {
        let drafts = DraftLifecycle::new(InMemoryDocumentStore::new());
        let draft = drafts.save_draft(&submission("Boards", "u1")).await.unwrap();
        drafts.list_drafts(&user("u1")).await.unwrap();
        drafts.list_drafts(&user("u2")).await.unwrap();

        drafts
            .update_draft(&draft.id, &submission("Boards", "u2"))
            .await
            .unwrap();

        assert!(drafts.cached_drafts(&user("u1")).await.unwrap().is_empty());
        let moved = drafts.cached_drafts(&user("u2")).await.unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].id, draft.id);
    }

    #[tokio::test]
    async fn unreachable_store_serves_the_last_listing() {
        let store = InMemoryDocumentStore::new();
        let drafts = DraftLifecycle::new(store.clone());
        let draft = drafts.save_draft(&submission("Boards", "u1")).await.unwrap();
        drafts.list_drafts(&user("u1")).await.unwrap();

        store.set_offline(true);

        assert!(matches!(
            drafts.list_drafts(&user("u1")).await,
            Err(CatalogError::Remote { .. })
        ));
        assert_eq!(drafts.list_drafts_or_cached(&user("u1")).await.unwrap(), vec![draft]);
        assert!(matches!(
            drafts.list_drafts_or_cached(&user("u2")).await,
            Err(CatalogError::Remote { .. })
        ));
    }
}
