use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

// Absolute URL: a scheme followed by a non-empty, whitespace free remainder.
const ABSOLUTE_URL_REGEX: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$";

// Schemes that address a host must name one after the `//`.
const HIERARCHICAL_URL_REGEX: &str = r"^(?i)(https?|wss?|ftp)://[^/?#\s]+";

static ABSOLUTE_URL_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ABSOLUTE_URL_REGEX).expect("ABSOLUTE_URL_REGEX must be a valid regex")
});

static HIERARCHICAL_URL_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(HIERARCHICAL_URL_REGEX).expect("HIERARCHICAL_URL_REGEX must be a valid regex")
});

static HIERARCHICAL_SCHEME_REGEX_COMPILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(https?|wss?|ftp):").expect("scheme regex must be a valid regex")
});

/// Newtype wrapper for an absolute URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    Empty,
    NotAbsolute,
    MissingHost,
}

impl Url {
    /// Parses an absolute URL, ignoring surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, UrlError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(UrlError::Empty);
        }
        if !ABSOLUTE_URL_REGEX_COMPILED.is_match(value) {
            return Err(UrlError::NotAbsolute);
        }
        if HIERARCHICAL_SCHEME_REGEX_COMPILED.is_match(value)
            && !HIERARCHICAL_URL_REGEX_COMPILED.is_match(value)
        {
            return Err(UrlError::MissingHost);
        }
        Ok(Url(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
