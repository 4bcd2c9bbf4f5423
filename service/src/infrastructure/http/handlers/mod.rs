use axum::http::StatusCode;

pub mod artists;
pub mod drafts;
pub mod platforms;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
