use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ANONYMOUS_USER_NAME, DraftId, UserId,
    artist::{ArtistSubmission, PlatformEntry, lenient_timestamp},
    normalize::{non_blank, platform_entries, platform_name, resolve_genre},
};

pub const UNTITLED_DRAFT_NAME: &'static str = "Untitled Artist";

/// An unpublished, user-private artist submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(skip)]
    pub id: DraftId,
    #[serde(flatten)]
    pub content: ArtistSubmission,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Rebuilds a draft from a stored document body.
    pub fn from_document(
        id: DraftId,
        data: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut draft: Draft = serde_json::from_value(serde_json::Value::Object(data))?;
        draft.id = id;
        Ok(draft)
    }

    /// Missing or unreadable timestamps count as the epoch.
    pub fn recency_key(&self) -> i64 {
        self.updated_at
            .map(|updated_at| updated_at.timestamp_millis())
            .unwrap_or(0)
    }

    pub fn owner(&self) -> UserId {
        UserId::or_anonymous(self.content.created_by.as_deref())
    }
}

/// Most recently updated first; ties keep their current order.
pub fn sort_by_recency(drafts: &mut [Draft]) {
    drafts.sort_by_key(|draft| std::cmp::Reverse(draft.recency_key()));
}

/// Shapes a "save for later" submission. Unlike [`crate::normalize`] nothing
/// is validated: half-typed URLs are kept, only blank rows are dropped.
pub fn prepare_draft(input: &ArtistSubmission) -> ArtistSubmission {
    let streaming_platforms = platform_entries(input)
        .into_iter()
        .filter_map(|entry| {
            let url = non_blank(entry.url.as_deref())?.to_owned();
            Some(PlatformEntry {
                name: Some(platform_name(entry.name.as_deref(), &url)),
                url: Some(url),
            })
        })
        .collect::<Vec<_>>();

    let first = streaming_platforms.first();

    ArtistSubmission {
        name: Some(
            non_blank(input.name.as_deref())
                .unwrap_or(UNTITLED_DRAFT_NAME)
                .to_owned(),
        ),
        genre: Some(resolve_genre(input).unwrap_or_default()),
        custom_genre: None,
        image_url: input.image_url.clone(),
        image_id: input.image_id.clone(),
        link: Some(first.and_then(|entry| entry.url.clone()).unwrap_or_default()),
        platform: Some(
            first
                .and_then(|entry| entry.name.clone())
                .unwrap_or_else(|| "Other".to_owned()),
        ),
        social: input.social.trimmed(),
        created_by: Some(UserId::or_anonymous(input.created_by.as_deref()).to_string()),
        creator_name: Some(
            non_blank(input.creator_name.as_deref())
                .unwrap_or(ANONYMOUS_USER_NAME)
                .to_owned(),
        ),
        is_own_music: Some(input.is_own_music.unwrap_or(false)),
        streaming_platforms: Some(streaming_platforms),
    }
}
