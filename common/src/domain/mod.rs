use std::fmt;

use nutype::nutype;
use serde::{Deserialize, Serialize};

pub mod artist;
pub mod draft;
pub mod normalize;
pub mod platform;
pub mod url;

pub use artist::{Artist, ArtistRecord, ArtistSubmission, PlatformEntry, SocialLinks, StreamingPlatform};
pub use draft::{Draft, prepare_draft, sort_by_recency};
pub use normalize::{ValidationError, normalize};
pub use platform::{Platform, PlatformInfo, PlatformType, classify};

/// Id the auth provider uses for creators that were not signed in.
pub const ANONYMOUS_USER_ID: &'static str = "anonymous";
pub const ANONYMOUS_USER_NAME: &'static str = "Anonymous User";

/// Id of a user as issued by the external auth provider.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 128),
    default = "anonymous",
    derive(
        Clone,
        Debug,
        Default,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct UserId(String);

impl UserId {
    /// Falls back to the anonymous user for blank or oversized input.
    pub fn or_anonymous(value: Option<&str>) -> Self {
        value
            .and_then(|value| UserId::try_new(value).ok())
            .unwrap_or_default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.as_ref() == ANONYMOUS_USER_ID
    }
}

/// Wrapper to prevent ID confusion
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtistId(String);

impl ArtistId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ArtistId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ArtistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wrapper to prevent ID confusion
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DraftId(String);

impl DraftId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DraftId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
