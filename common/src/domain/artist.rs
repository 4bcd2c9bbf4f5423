use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::IgnoredAny};

use crate::domain::{ArtistId, UserId};

// structs

/// One place the artist's music can be streamed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingPlatform {
    pub name: String,
    pub url: String,
}

/// Optional social profile links. Blank links are stored as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    #[serde(deserialize_with = "blank_as_none")]
    pub youtube: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub instagram: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub facebook: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub x: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub tiktok: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub website: Option<String>,
}

/// The canonical artist shape: fully defaulted and validated content,
/// without the store-owned id, timestamps and `savedBy` set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistRecord {
    pub name: String,
    pub genre: String,
    pub image_url: Option<String>,
    pub image_id: Option<String>,
    pub streaming_platforms: Vec<StreamingPlatform>,
    /// Legacy mirror of `streaming_platforms[0].url`
    pub link: String,
    /// Legacy mirror of `streaming_platforms[0].name`
    pub platform: String,
    #[serde(flatten)]
    pub social: SocialLinks,
    pub created_by: UserId,
    pub creator_name: String,
    pub is_own_music: bool,
}

/// A persisted artist as read back from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    /// Assigned by the store, never part of the stored body
    #[serde(skip)]
    pub id: ArtistId,
    #[serde(flatten)]
    pub record: ArtistRecord,
    #[serde(default, deserialize_with = "lenient_user_ids")]
    pub saved_by: BTreeSet<UserId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Loosely typed artist input as it arrives from a form or a draft.
///
/// `image_url` distinguishes an absent field (`None`) from an explicit
/// `null` (`Some(None)`), which edits use to remove the current image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtistSubmission {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_genre: Option<String>,
    #[serde(
        deserialize_with = "explicit_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streaming_platforms: Option<Vec<PlatformEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(flatten)]
    pub social: SocialLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_own_music: Option<bool>,
}

/// A streaming platform row of a submission, possibly half filled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformEntry {
    pub name: Option<String>,
    pub url: Option<String>,
}

// implementations

impl SocialLinks {
    /// Trims every link and drops the blank ones.
    pub fn trimmed(&self) -> Self {
        fn trim(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        }

        Self {
            youtube: trim(&self.youtube),
            instagram: trim(&self.instagram),
            facebook: trim(&self.facebook),
            x: trim(&self.x),
            tiktok: trim(&self.tiktok),
            website: trim(&self.website),
        }
    }
}

impl Artist {
    /// Rebuilds an artist from a stored document body.
    pub fn from_document(
        id: ArtistId,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut artist: Artist = serde_json::from_value(serde_json::Value::Object(data))?;
        artist.id = id;
        Ok(artist)
    }

    pub fn is_saved_by(&self, user_id: &UserId) -> bool {
        self.saved_by.contains(user_id)
    }

    /// Case-insensitive key the library is ordered by.
    pub fn sort_key(&self) -> String {
        self.record.name.to_lowercase()
    }
}

impl ArtistRecord {
    /// Serializes the record into a document body.
    pub fn to_document(&self) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(serde::ser::Error::custom("artist record must serialize to an object")),
        }
    }
}

impl From<&ArtistRecord> for ArtistSubmission {
    fn from(record: &ArtistRecord) -> Self {
        Self {
            name: Some(record.name.clone()),
            genre: Some(record.genre.clone()),
            custom_genre: None,
            image_url: Some(record.image_url.clone()),
            image_id: record.image_id.clone(),
            streaming_platforms: Some(
                record
                    .streaming_platforms
                    .iter()
                    .map(|platform| PlatformEntry {
                        name: Some(platform.name.clone()),
                        url: Some(platform.url.clone()),
                    })
                    .collect(),
            ),
            link: Some(record.link.clone()),
            platform: Some(record.platform.clone()),
            social: record.social.clone(),
            created_by: Some(record.created_by.to_string()),
            creator_name: Some(record.creator_name.clone()),
            is_own_music: Some(record.is_own_music),
        }
    }
}

impl ArtistSubmission {
    /// Image given as inline base64 data that still has to be uploaded.
    pub fn inline_image(&self) -> Option<&str> {
        match &self.image_url {
            Some(Some(url)) if url.starts_with("data:") => Some(url),
            _ => None,
        }
    }
}

// serde helpers

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|value| !value.trim().is_empty()))
}

fn explicit_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Keeps the valid ids of a stored user id list. Blank or oversized ids,
/// non-strings and a value that is not an array are skipped.
fn lenient_user_ids<'de, D>(deserializer: D) -> Result<BTreeSet<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(ids)) => ids,
        _ => return Ok(BTreeSet::new()),
    };
    Ok(ids
        .iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|id| UserId::try_new(id).ok())
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    Unreadable(IgnoredAny),
}

/// Accepts RFC 3339 strings or epoch milliseconds; anything else reads as `None`.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawTimestamp::Text(text)) => DateTime::parse_from_rfc3339(&text)
            .ok()
            .map(|timestamp| timestamp.with_timezone(&Utc)),
        Some(RawTimestamp::Millis(millis)) => DateTime::from_timestamp_millis(millis),
        Some(RawTimestamp::Unreadable(_)) | None => None,
    })
}
