use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::Form;
use serde::Deserialize;
use serde_json::{Map, Value};
use spins_common::{ENTITY_ID_FIELD_NAME, IMAGES_COLLECTION, UPDATED_FIELD_NAME, UserId};

use crate::domain::{
    catalog::timestamp,
    images::{ImageError, ImageHost, UploadedImage},
    store::{DocumentId, DocumentPatch, DocumentStore},
};
use crate::infrastructure::settings::ImageSettings;

const DEFAULT_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
const USER_AGENT: &str = concat!("hidden-spins/", env!("CARGO_PKG_VERSION"));

/// Uploads pictures to ImgBB and keeps their metadata in the `images`
/// collection. ImgBB offers no deletion on free keys, so deleting only drops
/// the metadata.
#[derive(Clone, Debug)]
pub struct ImgBbImageHost<S> {
    http_client: reqwest::Client,
    api_key: Option<String>,
    upload_url: String,
    store: S,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    id: String,
    url: String,
    display_url: String,
    delete_url: Option<String>,
    thumb: Option<Variant>,
    medium: Option<Variant>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    url: String,
}

impl<S: DocumentStore> ImgBbImageHost<S> {
    pub fn new(settings: &ImageSettings, store: S) -> Result<Self, ImageError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ImageError::Transport(e.to_string()))?;

        if settings.imgbb_api_key.is_none() {
            tracing::warn!("no ImgBB API key configured, artist images will not be uploaded");
        }

        Ok(Self {
            http_client,
            api_key: settings.imgbb_api_key.clone(),
            upload_url: settings
                .upload_url
                .clone()
                .unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_owned()),
            store,
        })
    }

    async fn upload_to_imgbb(&self, data: &str) -> Result<UploadData, ImageError> {
        let api_key = self.api_key.clone().ok_or(ImageError::NotConfigured)?;
        let form = Form::new()
            .text("key", api_key)
            .text("image", base64_payload(data).to_owned());

        let response = self
            .http_client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Transport(e.to_string()))?;
        Ok(body.data)
    }
}

impl<S: DocumentStore> ImageHost for ImgBbImageHost<S> {
    async fn upload_image(&self, data: &str, owner: &UserId) -> Result<UploadedImage, ImageError> {
        let uploaded = self.upload_to_imgbb(data).await?;
        tracing::debug!(imgbb_id = %uploaded.id, "image uploaded");

        let metadata = image_metadata(&uploaded, owner);
        let id = self.store.create_document(IMAGES_COLLECTION, metadata).await?;

        Ok(UploadedImage {
            id: id.into_string(),
            url: uploaded.display_url,
        })
    }

    async fn link_image(&self, image_id: &str, entity_id: &str) -> Result<(), ImageError> {
        let patch = DocumentPatch::new()
            .set(ENTITY_ID_FIELD_NAME, entity_id)
            .set(UPDATED_FIELD_NAME, timestamp(Utc::now()));
        self.store
            .update_document(IMAGES_COLLECTION, &DocumentId::new(image_id), patch)
            .await?;
        Ok(())
    }

    async fn delete_image(&self, image_id: &str) -> Result<(), ImageError> {
        self.store
            .delete_document(IMAGES_COLLECTION, &DocumentId::new(image_id))
            .await?;
        tracing::debug!(image_id, "image metadata deleted");
        Ok(())
    }
}

/// ImgBB wants the bare base64 payload, without the `data:...;base64,` prefix.
fn base64_payload(data: &str) -> &str {
    match data.split_once("base64,") {
        Some((_, payload)) => payload,
        None => data,
    }
}

fn image_metadata(uploaded: &UploadData, owner: &UserId) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("userId".to_owned(), Value::String(owner.to_string()));
    metadata.insert(ENTITY_ID_FIELD_NAME.to_owned(), Value::Null);
    metadata.insert("imgbbId".to_owned(), Value::String(uploaded.id.clone()));
    metadata.insert("url".to_owned(), Value::String(uploaded.url.clone()));
    metadata.insert("displayUrl".to_owned(), Value::String(uploaded.display_url.clone()));
    metadata.insert("deleteUrl".to_owned(), optional(&uploaded.delete_url));
    metadata.insert(
        "thumbUrl".to_owned(),
        optional(&uploaded.thumb.as_ref().map(|thumb| thumb.url.clone())),
    );
    metadata.insert(
        "mediumUrl".to_owned(),
        optional(&uploaded.medium.as_ref().map(|medium| medium.url.clone())),
    );
    metadata.insert("createdAt".to_owned(), timestamp(Utc::now()));
    metadata
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}
