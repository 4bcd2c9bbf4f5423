use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use spins_common::{
    ARTISTS_COLLECTION, Artist, ArtistId, ArtistRecord, ArtistSubmission, CREATED_BY_FIELD_NAME,
    CREATED_FIELD_NAME, SAVED_BY_FIELD_NAME, UPDATED_FIELD_NAME, UserId, normalize,
};

use crate::domain::{
    error::CatalogError,
    images::ImageHost,
    store::{Document, DocumentData, DocumentId, DocumentPatch, DocumentStore, QueryFilter, StoreError},
};

const ARTIST: &str = "artist";

/// The shared artist library: normalized writes, image handling and the
/// per-user listings.
#[derive(Clone, Debug)]
pub struct ArtistCatalog<S, I> {
    store: S,
    images: I,
}

impl<S: DocumentStore, I: ImageHost> ArtistCatalog<S, I> {
    pub fn new(store: S, images: I) -> Self {
        Self { store, images }
    }

    pub async fn add_artist(&self, submission: &ArtistSubmission) -> Result<Artist, CatalogError> {
        let mut record = normalize(submission)?;

        let mut uploaded = None;
        if let Some(data) = submission.inline_image() {
            match self.images.upload_image(data, &record.created_by).await {
                Ok(image) => {
                    record.image_url = Some(image.url);
                    record.image_id = Some(image.id.clone());
                    uploaded = Some(image.id);
                }
                Err(error) => {
                    tracing::warn!(%error, "image upload failed, storing artist without image");
                    record.image_url = None;
                    record.image_id = None;
                }
            }
        }

        let now = Utc::now();
        let mut data = encode(&record)?;
        data.insert(SAVED_BY_FIELD_NAME.to_owned(), Value::Array(Vec::new()));
        data.insert(CREATED_FIELD_NAME.to_owned(), timestamp(now));
        data.insert(UPDATED_FIELD_NAME.to_owned(), timestamp(now));

        let id = self
            .store
            .create_document(ARTISTS_COLLECTION, data.clone())
            .await
            .map_err(CatalogError::remote("add artist", ARTIST))?;
        tracing::debug!(artist_id = %id, name = %record.name, "artist created");

        if let Some(image_id) = uploaded {
            if let Err(error) = self.images.link_image(&image_id, id.as_str()).await {
                tracing::warn!(%error, %image_id, artist_id = %id, "failed to link image to artist");
            }
        }

        artist_from(Document { id, data }).map_err(CatalogError::remote("add artist", ARTIST))
    }

    /// Replaces the editable content of an artist. `savedBy` and `createdAt`
    /// are left as stored, as is the creator when the edit names none.
    pub async fn update_artist(
        &self,
        id: &ArtistId,
        submission: &ArtistSubmission,
    ) -> Result<Artist, CatalogError> {
        let current = self.get_artist(id).await?;
        let mut record = normalize(submission)?;
        if submission.created_by.as_deref().is_none_or(|user| user.trim().is_empty()) {
            record.created_by = current.record.created_by.clone();
            record.creator_name = current.record.creator_name.clone();
        }
        let (image_url, image_id) = self.resolve_image(&current, submission, &record).await;
        record.image_url = image_url;
        record.image_id = image_id;

        let now = Utc::now();
        let mut data = encode(&record)?;
        data.insert(UPDATED_FIELD_NAME.to_owned(), timestamp(now));

        self.store
            .update_document(ARTISTS_COLLECTION, &document_id(id), DocumentPatch::merge(data))
            .await
            .map_err(CatalogError::remote("update artist", ARTIST))?;
        tracing::debug!(artist_id = %id, "artist updated");

        Ok(Artist {
            record,
            updated_at: Some(now),
            ..current
        })
    }

    /// Deletes the artist and, best effort, its image.
    pub async fn delete_artist(&self, id: &ArtistId) -> Result<(), CatalogError> {
        let artist = self.get_artist(id).await?;

        if let Some(image_id) = &artist.record.image_id {
            if let Err(error) = self.images.delete_image(image_id).await {
                tracing::warn!(%error, %image_id, artist_id = %id, "failed to delete artist image");
            }
        }

        self.store
            .delete_document(ARTISTS_COLLECTION, &document_id(id))
            .await
            .map_err(CatalogError::remote("delete artist", ARTIST))?;
        tracing::debug!(artist_id = %id, "artist deleted");
        Ok(())
    }

    pub async fn get_artist(&self, id: &ArtistId) -> Result<Artist, CatalogError> {
        let document = self
            .store
            .get_document(ARTISTS_COLLECTION, &document_id(id))
            .await
            .map_err(CatalogError::remote("load artist", ARTIST))?
            .ok_or_else(|| CatalogError::not_found(ARTIST, id))?;

        artist_from(document).map_err(CatalogError::remote("load artist", ARTIST))
    }

    pub async fn list_artists(&self) -> Result<Vec<Artist>, CatalogError> {
        self.find(QueryFilter::All).await
    }

    pub async fn artists_by_creator(&self, user_id: &UserId) -> Result<Vec<Artist>, CatalogError> {
        self.find(QueryFilter::equals(CREATED_BY_FIELD_NAME, user_id.as_ref()))
            .await
    }

    pub async fn saved_artists(&self, user_id: &UserId) -> Result<Vec<Artist>, CatalogError> {
        self.find(QueryFilter::array_contains(SAVED_BY_FIELD_NAME, user_id.as_ref()))
            .await
    }

    async fn find(&self, filter: QueryFilter) -> Result<Vec<Artist>, CatalogError> {
        let documents = self
            .store
            .query_documents(ARTISTS_COLLECTION, &filter)
            .await
            .map_err(CatalogError::remote("list artists", ARTIST))?;
        Ok(sorted_artists(documents))
    }

    /// Image of an edited artist: absent keeps the current one, `null`
    /// removes it, a `data:` URL replaces it.
    async fn resolve_image(
        &self,
        current: &Artist,
        submission: &ArtistSubmission,
        record: &ArtistRecord,
    ) -> (Option<String>, Option<String>) {
        let current_url = current.record.image_url.clone();
        let current_id = current.record.image_id.clone();

        match (&submission.image_url, submission.inline_image()) {
            (None, _) => (current_url, current_id),
            (Some(None), _) => {
                if let Some(image_id) = &current_id {
                    self.discard_image(image_id, &current.id).await;
                }
                (None, None)
            }
            (Some(Some(_)), Some(data)) => {
                match self.images.upload_image(data, &record.created_by).await {
                    Ok(image) => {
                        if let Err(error) = self.images.link_image(&image.id, current.id.as_str()).await {
                            tracing::warn!(%error, image_id = %image.id, "failed to link image to artist");
                        }
                        if let Some(old) = current_id.filter(|old| *old != image.id) {
                            self.discard_image(&old, &current.id).await;
                        }
                        (Some(image.url), Some(image.id))
                    }
                    Err(error) => {
                        tracing::warn!(%error, artist_id = %current.id, "image upload failed, keeping current image");
                        (current_url, current_id)
                    }
                }
            }
            (Some(Some(_)), None) => {
                let image_id = record.image_id.clone().or_else(|| {
                    current_id.filter(|_| record.image_url == current_url)
                });
                (record.image_url.clone(), image_id)
            }
        }
    }

    async fn discard_image(&self, image_id: &str, artist_id: &ArtistId) {
        if let Err(error) = self.images.delete_image(image_id).await {
            tracing::warn!(%error, %image_id, %artist_id, "failed to delete replaced image");
        }
    }
}

/// Decodes store documents into artists ordered by case-insensitive name.
/// Unreadable documents are skipped.
pub fn sorted_artists(documents: Vec<Document>) -> Vec<Artist> {
    let mut artists = documents
        .into_iter()
        .filter_map(|document| match artist_from(document) {
            Ok(artist) => Some(artist),
            Err(error) => {
                tracing::warn!(%error, "skipping unreadable artist");
                None
            }
        })
        .collect::<Vec<_>>();
    // stable: equal names keep the store order
    artists.sort_by_cached_key(Artist::sort_key);
    artists
}

pub(crate) fn artist_from(document: Document) -> Result<Artist, StoreError> {
    let Document { id, data } = document;
    Artist::from_document(ArtistId::new(id.as_str()), data).map_err(|error| StoreError::Malformed {
        collection: ARTISTS_COLLECTION.to_owned(),
        id,
        reason: error.to_string(),
    })
}

pub(crate) fn document_id(id: &ArtistId) -> DocumentId {
    DocumentId::new(id.as_str())
}

/// Timestamps are stored the way browsers print them.
pub(crate) fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn encode(record: &ArtistRecord) -> Result<DocumentData, CatalogError> {
    record.to_document().map_err(|error| CatalogError::Remote {
        operation: "encode artist",
        source: StoreError::backend(error),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spins_common::{ValidationError, test_utils::submission};

    use super::*;
    use crate::domain::images::testing::FakeImageHost;
    use crate::infrastructure::memory::InMemoryDocumentStore;

    const INLINE_IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn catalog(images: FakeImageHost) -> ArtistCatalog<InMemoryDocumentStore, FakeImageHost> {
        ArtistCatalog::new(InMemoryDocumentStore::new(), images)
    }

    #[tokio::test]
    async fn added_artist_is_normalized_and_stamped() {
        let catalog = catalog(FakeImageHost::new());

        let artist = catalog.add_artist(&submission("Khruangbin", "u1")).await.unwrap();

        assert_eq!(artist.record.platform, "Spotify");
        assert!(artist.saved_by.is_empty());
        assert!(artist.created_at.is_some());
        assert_eq!(catalog.get_artist(&artist.id).await.unwrap(), artist);
    }

    #[tokio::test]
    async fn invalid_submission_is_not_stored() {
        let catalog = catalog(FakeImageHost::new());
        let input = ArtistSubmission {
            streaming_platforms: None,
            ..submission("Nobody", "u1")
        };

        let error = catalog.add_artist(&input).await.unwrap_err();

        assert!(matches!(error, CatalogError::Validation(ValidationError::MissingPlatform)));
        assert!(catalog.list_artists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inline_image_is_uploaded_and_linked() {
        let images = FakeImageHost::new();
        let catalog = catalog(images.clone());
        let input = ArtistSubmission {
            image_url: Some(Some(INLINE_IMAGE.to_owned())),
            ..submission("Boards", "u1")
        };

        let artist = catalog.add_artist(&input).await.unwrap();

        assert_eq!(artist.record.image_id.as_deref(), Some("img-1"));
        assert_eq!(artist.record.image_url.as_deref(), Some("https://i.ibb.co/img-1/cover.png"));
        assert_eq!(images.links(), vec![("img-1".to_owned(), artist.id.to_string())]);
        assert_eq!(images.uploads(), 1);
    }

    #[tokio::test]
    async fn failed_upload_stores_artist_without_image() {
        let catalog = catalog(FakeImageHost::failing());
        let input = ArtistSubmission {
            image_url: Some(Some(INLINE_IMAGE.to_owned())),
            ..submission("Boards", "u1")
        };

        let artist = catalog.add_artist(&input).await.unwrap();

        assert_eq!(artist.record.image_url, None);
        assert_eq!(artist.record.image_id, None);
    }

    #[tokio::test]
    async fn edit_keeps_saved_by_and_image_when_absent() {
        let images = FakeImageHost::new();
        let catalog = catalog(images.clone());
        let artist = catalog
            .add_artist(&ArtistSubmission {
                image_url: Some(Some(INLINE_IMAGE.to_owned())),
                ..submission("Boards", "u1")
            })
            .await
            .unwrap();
        catalog
            .store
            .update_document(
                ARTISTS_COLLECTION,
                &document_id(&artist.id),
                DocumentPatch::new().array_union(SAVED_BY_FIELD_NAME, vec![json!("u2")]),
            )
            .await
            .unwrap();

        let edit = ArtistSubmission {
            genre: Some("Ambient".to_owned()),
            created_by: None,
            ..submission("Boards of Canada", "u1")
        };
        catalog.update_artist(&artist.id, &edit).await.unwrap();

        let stored = catalog.get_artist(&artist.id).await.unwrap();
        assert_eq!(stored.record.name, "Boards of Canada");
        assert_eq!(stored.record.genre, "Ambient");
        assert_eq!(stored.record.image_id.as_deref(), Some("img-1"));
        assert!(stored.is_saved_by(&UserId::or_anonymous(Some("u2"))));
        assert_eq!(stored.created_at, artist.created_at);
        assert_eq!(stored.record.created_by.as_ref(), "u1");
        assert!(images.deletes().is_empty());
    }

    #[tokio::test]
    async fn edit_with_null_image_removes_it() {
        let images = FakeImageHost::new();
        let catalog = catalog(images.clone());
        let artist = catalog
            .add_artist(&ArtistSubmission {
                image_url: Some(Some(INLINE_IMAGE.to_owned())),
                ..submission("Boards", "u1")
            })
            .await
            .unwrap();

        let edit = ArtistSubmission {
            image_url: Some(None),
            ..submission("Boards", "u1")
        };
        let updated = catalog.update_artist(&artist.id, &edit).await.unwrap();

        assert_eq!(updated.record.image_url, None);
        assert_eq!(images.deletes(), vec!["img-1".to_owned()]);
        assert_eq!(catalog.get_artist(&artist.id).await.unwrap().record.image_id, None);
    }

    #[tokio::test]
    async fn replaced_image_deletes_the_old_one() {
        let images = FakeImageHost::new();
        let catalog = catalog(images.clone());
        let with_image = ArtistSubmission {
            image_url: Some(Some(INLINE_IMAGE.to_owned())),
            ..submission("Boards", "u1")
        };
        let artist = catalog.add_artist(&with_image).await.unwrap();

        let updated = catalog.update_artist(&artist.id, &with_image).await.unwrap();

        assert_eq!(updated.record.image_id.as_deref(), Some("img-2"));
        assert_eq!(images.deletes(), vec!["img-1".to_owned()]);
    }

    #[tokio::test]
    async fn editing_or_deleting_a_missing_artist_is_not_found() {
        let catalog = catalog(FakeImageHost::new());
        let missing = ArtistId::new("missing");

        let edit = catalog.update_artist(&missing, &submission("a", "u1")).await;
        let delete = catalog.delete_artist(&missing).await;

        assert!(matches!(edit, Err(CatalogError::NotFound { entity: "artist", .. })));
        assert!(matches!(delete, Err(CatalogError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_removes_artist_and_image() {
        let images = FakeImageHost::new();
        let catalog = catalog(images.clone());
        let artist = catalog
            .add_artist(&ArtistSubmission {
                image_url: Some(Some(INLINE_IMAGE.to_owned())),
                ..submission("Boards", "u1")
            })
            .await
            .unwrap();

        catalog.delete_artist(&artist.id).await.unwrap();

        assert!(matches!(
            catalog.get_artist(&artist.id).await,
            Err(CatalogError::NotFound { .. })
        ));
        assert_eq!(images.deletes(), vec!["img-1".to_owned()]);
    }

    #[tokio::test]
    async fn listings_are_sorted_case_insensitively() {
        let catalog = catalog(FakeImageHost::new());
        for (name, user) in [("beach house", "u1"), ("Air", "u2"), ("Caribou", "u1"), ("air", "u1")] {
            catalog.add_artist(&submission(name, user)).await.unwrap();
        }

        let names = |artists: Vec<Artist>| {
            artists
                .into_iter()
                .map(|artist| artist.record.name)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(catalog.list_artists().await.unwrap()),
            vec!["Air", "air", "beach house", "Caribou"]
        );
        assert_eq!(
            names(catalog.artists_by_creator(&UserId::or_anonymous(Some("u1"))).await.unwrap()),
            vec!["air", "beach house", "Caribou"]
        );
    }

    #[tokio::test]
    async fn saved_artists_follow_saved_by() {
        let catalog = catalog(FakeImageHost::new());
        let saved = catalog.add_artist(&submission("Saved", "u1")).await.unwrap();
        catalog.add_artist(&submission("Other", "u1")).await.unwrap();
        catalog
            .store
            .update_document(
                ARTISTS_COLLECTION,
                &document_id(&saved.id),
                DocumentPatch::new().array_union(SAVED_BY_FIELD_NAME, vec![json!("u9")]),
            )
            .await
            .unwrap();

        let artists = catalog
            .saved_artists(&UserId::or_anonymous(Some("u9")))
            .await
            .unwrap();

        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].id, saved.id);
    }
}
