use std::future::Future;

use spins_common::UserId;

use crate::domain::store::StoreError;

/// External host for artist pictures.
pub trait ImageHost: Clone + Send + Sync + 'static {
    /// Uploads base64 image data (a `data:` URL or the bare payload) on
    /// behalf of `owner`.
    fn upload_image(
        &self,
        data: &str,
        owner: &UserId,
    ) -> impl Future<Output = Result<UploadedImage, ImageError>> + Send;

    /// Records which entity an uploaded image belongs to.
    fn link_image(
        &self,
        image_id: &str,
        entity_id: &str,
    ) -> impl Future<Output = Result<(), ImageError>> + Send;

    fn delete_image(&self, image_id: &str) -> impl Future<Output = Result<(), ImageError>> + Send;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image host is not configured")]
    NotConfigured,
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("image host request failed: {0}")]
    Transport(String),
    #[error("image metadata: {0}")]
    Metadata(#[from] StoreError),
}
