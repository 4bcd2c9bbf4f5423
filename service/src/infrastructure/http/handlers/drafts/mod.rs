use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use spins_common::{Artist, ArtistSubmission, DraftId};

use crate::domain::AppState;
use crate::domain::error::CatalogError;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::artists::user_id;
use crate::infrastructure::http::handlers::drafts::dto::{
    ManyDraftsResponse, OneDraftResponse, PublishResponse,
};

pub mod dto;

pub async fn list_user_drafts<S: AppState>(
    Path(user): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<ManyDraftsResponse>, ApiError> {
    let drafts = state.drafts().list_drafts_or_cached(&user_id(&user)?).await?;
    Ok(ApiSuccess::new(StatusCode::OK, drafts.into()))
}

pub async fn find_draft_by_id<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<OneDraftResponse>, ApiError> {
    state
        .drafts()
        .get_draft(&DraftId::new(id))
        .await
        .map_err(ApiError::from)
        .map(|draft| ApiSuccess::new(StatusCode::OK, draft.into()))
}

pub async fn create_draft<S: AppState>(
    State(state): State<S>,
    Json(submission): Json<ArtistSubmission>,
) -> Result<ApiSuccess<OneDraftResponse>, ApiError> {
    state
        .drafts()
        .save_draft(&submission)
        .await
        .map_err(ApiError::from)
        .map(|draft| ApiSuccess::new(StatusCode::CREATED, draft.into()))
}

pub async fn update_draft<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
    Json(submission): Json<ArtistSubmission>,
) -> Result<ApiSuccess<OneDraftResponse>, ApiError> {
    state
        .drafts()
        .update_draft(&DraftId::new(id), &submission)
        .await
        .map_err(ApiError::from)
        .map(|draft| ApiSuccess::new(StatusCode::OK, draft.into()))
}

pub async fn delete_draft<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<StatusCode, ApiError> {
    state.drafts().delete_draft(&DraftId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Publishes the draft as an artist and deletes it.
pub async fn publish_draft<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<PublishResponse>, ApiError> {
    let drafts = state.drafts();
    let draft = drafts.get_draft(&DraftId::new(id)).await?;

    let catalog = state.catalog();
    let result = drafts
        .promote(&draft, |submission| async move { catalog.add_artist(&submission).await })
        .await;

    publish_response(result)
}

/// A published artist is a success even when the draft outlived it.
fn publish_response(result: Result<Artist, CatalogError>) -> Result<ApiSuccess<PublishResponse>, ApiError> {
    match result {
        Ok(artist) => Ok(ApiSuccess::new(
            StatusCode::CREATED,
            PublishResponse {
                data: artist.into(),
                warning: None,
            },
        )),
        Err(CatalogError::PartialFailure { artist, draft_id, source }) => {
            let warning = format!(
                "artist was published but draft {} could not be deleted: {}",
                draft_id, source
            );
            Ok(ApiSuccess::new(
                StatusCode::CREATED,
                PublishResponse {
                    data: (*artist).into(),
                    warning: Some(warning),
                },
            ))
        }
        Err(error) => Err(error.into()),
    }
}
