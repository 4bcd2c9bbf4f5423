use serde::{Deserialize, Serialize};
use spins_common::Artist;

use crate::domain::saves::SaveState;

#[derive(Debug, Clone, Serialize)]
pub struct ManyArtistsResponse {
    data: Vec<ArtistResponse>,
    meta: MetadataResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataResponse {
    total: usize,
    /// Snapshot generation, only for the live listing
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OneArtistResponse {
    data: ArtistResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistResponse {
    id: String,
    #[serde(flatten)]
    artist: Artist,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistsQuery {
    pub created_by: Option<String>,
    pub saved_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub user_id: String,
    pub currently_saved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveResponse {
    pub saved: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStateQuery {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveStateResponse {
    saved: bool,
    /// A toggle is still waiting for the store
    pending: bool,
}

impl From<SaveState> for SaveStateResponse {
    fn from(state: SaveState) -> Self {
        Self {
            saved: state.is_saved(),
            pending: matches!(state, SaveState::Saving { .. }),
        }
    }
}

impl ManyArtistsResponse {
    pub fn new(artists: Vec<Artist>, generation: Option<u64>) -> Self {
        let data = artists.into_iter().map(ArtistResponse::from).collect::<Vec<_>>();
        Self {
            meta: MetadataResponse {
                total: data.len(),
                generation,
            },
            data,
        }
    }
}

impl From<Artist> for OneArtistResponse {
    fn from(artist: Artist) -> Self {
        Self {
            data: ArtistResponse::from(artist),
        }
    }
}

impl From<Artist> for ArtistResponse {
    fn from(artist: Artist) -> Self {
        Self {
            id: artist.id.to_string(),
            artist,
        }
    }
}
