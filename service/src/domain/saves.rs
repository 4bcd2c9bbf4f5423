use std::{collections::HashMap, sync::Arc};

use serde_json::Value;
use spins_common::{ARTISTS_COLLECTION, Artist, ArtistId, SAVED_BY_FIELD_NAME, UserId};
use tokio::sync::Mutex;

use crate::domain::{
    catalog::document_id,
    error::CatalogError,
    store::{DocumentPatch, DocumentStore},
};

/// Save state of one (artist, user) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveState {
    Unsaved,
    Saved,
    /// Waiting for the store; `was_saved` is the state to fall back to.
    Saving { was_saved: bool },
}

impl SaveState {
    pub fn stable(saved: bool) -> Self {
        if saved { SaveState::Saved } else { SaveState::Unsaved }
    }

    /// State shown to the user, pending toggles included.
    pub fn is_saved(self) -> bool {
        match self {
            SaveState::Unsaved => false,
            SaveState::Saved => true,
            SaveState::Saving { was_saved } => !was_saved,
        }
    }
}

type PairKey = (ArtistId, UserId);

/// Optimistic per-user favorites on top of the `savedBy` set.
///
/// Only `Saved` and `Saving` pairs are kept; an unsaved pair has no entry.
#[derive(Clone)]
pub struct SaveToggle<S> {
    store: S,
    states: Arc<Mutex<HashMap<PairKey, SaveState>>>,
}

impl<S: DocumentStore> SaveToggle<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Adds or removes `user_id` from the artist's `savedBy` set and returns
    /// the new saved state. The set primitives make repeated identical
    /// toggles harmless.
    pub async fn toggle_save(
        &self,
        artist_id: &ArtistId,
        user_id: &UserId,
        currently_saved: bool,
    ) -> Result<bool, CatalogError> {
        let id = document_id(artist_id);
        self.store
            .get_document(ARTISTS_COLLECTION, &id)
            .await
            .map_err(CatalogError::remote("load artist", "artist"))?
            .ok_or_else(|| CatalogError::not_found("artist", artist_id))?;

        let member = vec![Value::String(user_id.to_string())];
        let patch = if currently_saved {
            DocumentPatch::new().array_remove(SAVED_BY_FIELD_NAME, member)
        } else {
            DocumentPatch::new().array_union(SAVED_BY_FIELD_NAME, member)
        };

        // NotFound here means the artist was deleted after the check above
        self.store
            .update_document(ARTISTS_COLLECTION, &id, patch)
            .await
            .map_err(CatalogError::remote("toggle save", "artist"))?;

        tracing::debug!(%artist_id, %user_id, saved = !currently_saved, "save toggled");
        Ok(!currently_saved)
    }

    /// Runs one toggle through the state machine.
    ///
    /// The pair is `Saving` while the store call is in flight and settles on
    /// the confirmed state, or back on `currently_saved` when the call fails.
    /// A toggle of a pair already `Saving` is not sent again.
    pub async fn toggle(
        &self,
        artist_id: &ArtistId,
        user_id: &UserId,
        currently_saved: bool,
    ) -> Result<bool, CatalogError> {
        let key = (artist_id.clone(), user_id.clone());
        {
            let mut states = self.states.lock().await;
            if let Some(state @ SaveState::Saving { .. }) = states.get(&key) {
                tracing::debug!(%artist_id, %user_id, "save already in flight");
                return Ok(state.is_saved());
            }
            states.insert(key.clone(), SaveState::Saving { was_saved: currently_saved });
        }

        let result = self.toggle_save(artist_id, user_id, currently_saved).await;

        let settled = match &result {
            Ok(saved) => *saved,
            Err(error) => {
                tracing::error!(%error, %artist_id, %user_id, "save toggle failed, reverting");
                currently_saved
            }
        };
        let mut states = self.states.lock().await;
        if settled {
            states.insert(key, SaveState::Saved);
        } else {
            states.remove(&key);
        }
        result
    }

    /// `None` when the pair is unsaved or was never seen.
    pub async fn state(&self, artist_id: &ArtistId, user_id: &UserId) -> Option<SaveState> {
        self.states
            .lock()
            .await
            .get(&(artist_id.clone(), user_id.clone()))
            .copied()
    }

    /// Seeds stable states from a snapshot. Pairs in flight are left alone.
    pub async fn prime(&self, user_id: &UserId, artists: &[Artist]) {
        let mut states = self.states.lock().await;
        for artist in artists {
            let key = (artist.id.clone(), user_id.clone());
            if matches!(states.get(&key), Some(SaveState::Saving { .. })) {
                continue;
            }
            if artist.is_saved_by(user_id) {
                states.insert(key, SaveState::Saved);
            } else {
                states.remove(&key);
            }
        }
    }

    /// Drops every pair of a deleted artist.
    pub async fn forget_artist(&self, artist_id: &ArtistId) {
        self.states
            .lock()
            .await
            .retain(|(artist, _), _| artist != artist_id);
    }
}
