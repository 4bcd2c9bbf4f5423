//! Fixtures for building artist submissions.
//!
//! Public so that other crates can reuse them for their own tests.

use crate::domain::{ArtistSubmission, PlatformEntry};

pub fn platform(name: Option<&str>, url: &str) -> PlatformEntry {
    PlatformEntry {
        name: name.map(str::to_owned),
        url: Some(url.to_owned()),
    }
}

pub fn submission_with_platforms(platforms: Vec<PlatformEntry>) -> ArtistSubmission {
    ArtistSubmission {
        streaming_platforms: Some(platforms),
        ..ArtistSubmission::default()
    }
}

/// A valid submission with a single Spotify link, created by `user`.
pub fn submission(name: &str, user: &str) -> ArtistSubmission {
    ArtistSubmission {
        name: Some(name.to_owned()),
        genre: Some("Indie".to_owned()),
        created_by: Some(user.to_owned()),
        creator_name: Some(format!("{user} name")),
        ..submission_with_platforms(vec![platform(
            Some("Spotify"),
            &format!("https://open.spotify.com/artist/{}", name.to_lowercase().replace(' ', "-")),
        )])
    }
}
