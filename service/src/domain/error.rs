use spins_common::{Artist, DraftId, ValidationError};

use crate::domain::store::StoreError;

/// Failure of a public catalog, draft or save operation.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Bad user input, shown next to the form field.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The referenced entity vanished.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    /// The store failed; the user may retry.
    #[error("failed to {operation}")]
    Remote {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
    /// The artist was published but its draft is still stored.
    #[error("artist {} was published but draft {draft_id} could not be deleted", artist.id)]
    PartialFailure {
        artist: Box<Artist>,
        draft_id: DraftId,
        #[source]
        source: Box<CatalogError>,
    },
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Maps a store failure, keeping a vanished document as `NotFound`.
    pub fn remote(operation: &'static str, entity: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::NotFound { id, .. } => Self::not_found(entity, id),
            source => Self::Remote { operation, source },
        }
    }
}
