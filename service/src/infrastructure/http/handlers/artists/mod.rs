use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use spins_common::{ArtistId, ArtistSubmission, UserId};

use crate::domain::AppState;
use crate::domain::saves::SaveState;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::artists::dto::{
    ArtistsQuery, ManyArtistsResponse, OneArtistResponse, SaveRequest, SaveResponse,
    SaveStateQuery, SaveStateResponse,
};
use crate::infrastructure::http::querystring::QueryString;

pub mod dto;

/// Live listing from the artist subscription, or a filtered query.
/// Until the first snapshot arrives the store is queried directly.
pub async fn list_artists<S: AppState>(
    QueryString(params): QueryString<ArtistsQuery>,
    State(state): State<S>,
) -> Result<ApiSuccess<ManyArtistsResponse>, ApiError> {
    let catalog = state.catalog();
    let response = match (params.created_by, params.saved_by) {
        (Some(created_by), _) => {
            let artists = catalog.artists_by_creator(&user_id(&created_by)?).await?;
            ManyArtistsResponse::new(artists, None)
        }
        (None, Some(saved_by)) => {
            let saved_by = user_id(&saved_by)?;
            let artists = catalog.saved_artists(&saved_by).await?;
            state.saves().prime(&saved_by, &artists).await;
            ManyArtistsResponse::new(artists, None)
        }
        (None, None) => {
            let snapshot = state.artists_snapshot();
            if snapshot.generation == 0 {
                // no snapshot pushed yet
                ManyArtistsResponse::new(catalog.list_artists().await?, None)
            } else {
                ManyArtistsResponse::new(snapshot.artists.clone(), Some(snapshot.generation))
            }
        }
    };

    Ok(ApiSuccess::new(StatusCode::OK, response))
}

pub async fn find_artist_by_id<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<OneArtistResponse>, ApiError> {
    state
        .catalog()
        .get_artist(&ArtistId::new(id))
        .await
        .map_err(ApiError::from)
        .map(|artist| ApiSuccess::new(StatusCode::OK, artist.into()))
}

pub async fn create_artist<S: AppState>(
    State(state): State<S>,
    Json(submission): Json<ArtistSubmission>,
) -> Result<ApiSuccess<OneArtistResponse>, ApiError> {
    state
        .catalog()
        .add_artist(&submission)
        .await
        .map_err(ApiError::from)
        .map(|artist| ApiSuccess::new(StatusCode::CREATED, artist.into()))
}

pub async fn update_artist<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
    Json(submission): Json<ArtistSubmission>,
) -> Result<ApiSuccess<OneArtistResponse>, ApiError> {
    state
        .catalog()
        .update_artist(&ArtistId::new(id), &submission)
        .await
        .map_err(ApiError::from)
        .map(|artist| ApiSuccess::new(StatusCode::OK, artist.into()))
}

pub async fn delete_artist<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<StatusCode, ApiError> {
    let artist_id = ArtistId::new(id);
    state.catalog().delete_artist(&artist_id).await?;
    state.saves().forget_artist(&artist_id).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_save<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
    Json(request): Json<SaveRequest>,
) -> Result<ApiSuccess<SaveResponse>, ApiError> {
    let user_id = user_id(&request.user_id)?;
    let saved = state
        .saves()
        .toggle(&ArtistId::new(id), &user_id, request.currently_saved)
        .await?;

    Ok(ApiSuccess::new(StatusCode::OK, SaveResponse { saved }))
}

/// Save state of the pair as the user should see it, pending toggles included.
pub async fn save_state<S: AppState>(
    Path(id): Path<String>,
    QueryString(params): QueryString<SaveStateQuery>,
    State(state): State<S>,
) -> Result<ApiSuccess<SaveStateResponse>, ApiError> {
    let user_id = user_id(&params.user_id)?;
    let artist_id = ArtistId::new(id);

    let save_state = match state.saves().state(&artist_id, &user_id).await {
        Some(save_state) => save_state,
        None => {
            let artist = state.catalog().get_artist(&artist_id).await?;
            state.saves().prime(&user_id, std::slice::from_ref(&artist)).await;
            SaveState::stable(artist.is_saved_by(&user_id))
        }
    };

    Ok(ApiSuccess::new(StatusCode::OK, SaveStateResponse::from(save_state)))
}

pub(crate) fn user_id(value: &str) -> Result<UserId, ApiError> {
    UserId::try_new(value).map_err(|err| ApiError::UnprocessableEntity(err.to_string()))
}
