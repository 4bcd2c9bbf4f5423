use axum::http::StatusCode;
use serde::Deserialize;
use spins_common::{PlatformInfo, classify};

use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::querystring::QueryString;

#[derive(Deserialize, Debug)]
pub struct ClassifyParams {
    #[serde(default)]
    pub url: String,
}

pub async fn classify_platform(
    QueryString(params): QueryString<ClassifyParams>,
) -> Result<ApiSuccess<PlatformInfo>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, classify(&params.url)))
}
