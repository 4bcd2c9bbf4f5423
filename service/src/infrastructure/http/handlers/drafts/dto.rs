use serde::Serialize;
use spins_common::Draft;

use crate::infrastructure::http::handlers::artists::dto::ArtistResponse;

#[derive(Debug, Clone, Serialize)]
pub struct ManyDraftsResponse {
    data: Vec<DraftResponse>,
    meta: MetadataResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataResponse {
    total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OneDraftResponse {
    data: DraftResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftResponse {
    id: String,
    #[serde(flatten)]
    draft: Draft,
}

/// Result of publishing a draft. `warning` is set when the draft could not be
/// deleted afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    pub data: ArtistResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<Vec<Draft>> for ManyDraftsResponse {
    fn from(drafts: Vec<Draft>) -> Self {
        Self {
            meta: MetadataResponse { total: drafts.len() },
            data: drafts.into_iter().map(DraftResponse::from).collect(),
        }
    }
}

impl From<Draft> for OneDraftResponse {
    fn from(draft: Draft) -> Self {
        Self {
            data: DraftResponse::from(draft),
        }
    }
}

impl From<Draft> for DraftResponse {
    fn from(draft: Draft) -> Self {
        Self {
            id: draft.id.to_string(),
            draft,
        }
    }
}
