use itertools::Itertools;

use crate::domain::{
    ANONYMOUS_USER_NAME, UserId,
    artist::{ArtistRecord, ArtistSubmission, PlatformEntry, StreamingPlatform},
    platform::{Platform, classify},
    url::Url,
};

pub const UNKNOWN_ARTIST_NAME: &'static str = "Unknown Artist";
pub const UNSPECIFIED_GENRE: &'static str = "Unspecified";
/// Genre value the form sends when the user typed their own genre
pub const CUSTOM_GENRE_SENTINEL: &'static str = "custom";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please enter at least one streaming platform URL")]
    MissingPlatform,
    #[error("please enter a valid URL for {platform}")]
    InvalidUrl { platform: String, url: String },
}

/// Turns loosely typed input into the canonical artist record.
///
/// Pure: nothing is persisted or uploaded here. Validation is fail-fast, the
/// first platform with an unparseable URL is reported.
pub fn normalize(input: &ArtistSubmission) -> Result<ArtistRecord, ValidationError> {
    let streaming_platforms = streaming_platforms(input)?;
    let first = &streaming_platforms[0];

    Ok(ArtistRecord {
        name: non_blank(input.name.as_deref())
            .unwrap_or(UNKNOWN_ARTIST_NAME)
            .to_owned(),
        genre: resolve_genre(input).unwrap_or_else(|| UNSPECIFIED_GENRE.to_owned()),
        image_url: non_blank(input.image_url.clone().flatten().as_deref()).map(str::to_owned),
        image_id: non_blank(input.image_id.as_deref()).map(str::to_owned),
        link: first.url.clone(),
        platform: first.name.clone(),
        social: input.social.trimmed(),
        created_by: UserId::or_anonymous(input.created_by.as_deref()),
        creator_name: non_blank(input.creator_name.as_deref())
            .unwrap_or(ANONYMOUS_USER_NAME)
            .to_owned(),
        is_own_music: input.is_own_music.unwrap_or(false),
        streaming_platforms,
    })
}

/// Final genre of a submission: the title-cased custom genre on the custom
/// path, the selected preset untouched otherwise. `None` when blank.
pub fn resolve_genre(input: &ArtistSubmission) -> Option<String> {
    let genre = non_blank(input.genre.as_deref())?;
    if genre == CUSTOM_GENRE_SENTINEL {
        non_blank(input.custom_genre.as_deref()).map(title_case)
    } else {
        Some(genre.to_owned())
    }
}

/// Capitalizes the first letter of every space-separated word and lowercases
/// the rest. Spacing is kept as given.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .join(" ")
}

/// Name for a streaming entry: the one given, else the detected streaming
/// platform, else "Other".
pub fn platform_name(given: Option<&str>, url: &str) -> String {
    if let Some(name) = non_blank(given) {
        return name.to_owned();
    }
    let info = classify(url);
    if info.is_streaming() {
        info.name.name().to_owned()
    } else {
        Platform::Other.name().to_owned()
    }
}

/// Entries of a submission, falling back to the legacy single `link`.
pub(crate) fn platform_entries(input: &ArtistSubmission) -> Vec<PlatformEntry> {
    match &input.streaming_platforms {
        Some(entries) if !entries.is_empty() => entries.clone(),
        _ => input
            .link
            .as_ref()
            .map(|link| PlatformEntry {
                name: input.platform.clone(),
                url: Some(link.clone()),
            })
            .into_iter()
            .collect(),
    }
}

fn streaming_platforms(input: &ArtistSubmission) -> Result<Vec<StreamingPlatform>, ValidationError> {
    let entries = platform_entries(input)
        .into_iter()
        .filter(|entry| non_blank(entry.url.as_deref()).is_some())
        .collect::<Vec<_>>();

    if entries.is_empty() {
        return Err(ValidationError::MissingPlatform);
    }

    let mut platforms = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw_url = entry.url.as_deref().unwrap_or_default();
        let url = Url::parse(raw_url).map_err(|_| ValidationError::InvalidUrl {
            platform: platform_name(entry.name.as_deref(), raw_url),
            url: raw_url.to_owned(),
        })?;
        platforms.push(StreamingPlatform {
            name: platform_name(entry.name.as_deref(), url.as_str()),
            url: url.into_string(),
        });
    }

    Ok(platforms
        .into_iter()
        .unique_by(|platform| platform.url.clone())
        .collect())
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SocialLinks;
    use crate::test_utils::{platform, submission_with_platforms};

    #[test]
    fn blank_form_with_custom_genre() {
        let input = ArtistSubmission {
            name: Some(String::new()),
            genre: Some("custom".to_owned()),
            custom_genre: Some("lo fi beats".to_owned()),
            streaming_platforms: Some(vec![platform(Some("Spotify"), "https://open.spotify.com/artist/x")]),
            ..ArtistSubmission::default()
        };

        let record = normalize(&input).unwrap();

        assert_eq!(record.name, "Unknown Artist");
        assert_eq!(record.genre, "Lo Fi Beats");
        assert_eq!(
            record.streaming_platforms[0],
            StreamingPlatform {
                name: "Spotify".to_owned(),
                url: "https://open.spotify.com/artist/x".to_owned(),
            }
        );
        assert_eq!(record.link, "https://open.spotify.com/artist/x");
        assert_eq!(record.platform, "Spotify");
    }

    #[test]
    fn missing_platform_is_rejected() {
        let no_platforms = ArtistSubmission::default();
        let blank_urls = submission_with_platforms(vec![platform(Some("Spotify"), "   ")]);
        let empty_list = ArtistSubmission {
            streaming_platforms: Some(Vec::new()),
            ..ArtistSubmission::default()
        };

        for input in [no_platforms, blank_urls, empty_list] {
            assert_eq!(normalize(&input), Err(ValidationError::MissingPlatform));
        }
    }

    #[test]
    fn first_invalid_url_is_reported() {
        let input = submission_with_platforms(vec![
            platform(Some("Spotify"), "https://open.spotify.com/artist/x"),
            platform(Some("Bandcamp"), "bandcamp dot com"),
            platform(None, "also bad"),
        ]);

        assert_eq!(
            normalize(&input),
            Err(ValidationError::InvalidUrl {
                platform: "Bandcamp".to_owned(),
                url: "bandcamp dot com".to_owned(),
            })
        );
    }

    #[test]
    fn defaults_are_applied() {
        let input = submission_with_platforms(vec![platform(None, "https://example.org/band")]);

        let record = normalize(&input).unwrap();

        assert_eq!(record.genre, UNSPECIFIED_GENRE);
        assert_eq!(record.streaming_platforms[0].name, "Other");
        assert!(record.created_by.is_anonymous());
        assert_eq!(record.creator_name, "Anonymous User");
        assert!(!record.is_own_music);
        assert_eq!(record.image_url, None);
    }

    #[test]
    fn missing_platform_name_is_detected_from_streaming_url() {
        let input = submission_with_platforms(vec![platform(Some(" "), "https://artist.bandcamp.com")]);
        assert_eq!(normalize(&input).unwrap().platform, "Bandcamp");
    }

    #[test]
    fn preset_genre_is_not_title_cased() {
        let input = ArtistSubmission {
            genre: Some("hip-hop/rap".to_owned()),
            ..submission_with_platforms(vec![platform(None, "https://tidal.com/a")])
        };
        assert_eq!(normalize(&input).unwrap().genre, "hip-hop/rap");
    }

    #[test]
    fn blank_custom_genre_is_unspecified() {
        let input = ArtistSubmission {
            genre: Some("custom".to_owned()),
            custom_genre: Some("  ".to_owned()),
            ..submission_with_platforms(vec![platform(None, "https://tidal.com/a")])
        };
        assert_eq!(normalize(&input).unwrap().genre, UNSPECIFIED_GENRE);
    }

    #[test]
    fn duplicate_platform_urls_are_collapsed() {
        let input = submission_with_platforms(vec![
            platform(Some("Spotify"), "https://open.spotify.com/artist/x"),
            platform(Some("Other"), " https://open.spotify.com/artist/x "),
            platform(None, "https://deezer.com/artist/1"),
        ]);

        let record = normalize(&input).unwrap();

        assert_eq!(record.streaming_platforms.len(), 2);
        assert_eq!(record.streaming_platforms[0].name, "Spotify");
        assert_eq!(record.streaming_platforms[1].name, "Deezer");
    }

    #[test]
    fn legacy_link_is_used_when_no_platform_list() {
        let input = ArtistSubmission {
            link: Some("https://soundcloud.com/band".to_owned()),
            platform: Some("SoundCloud".to_owned()),
            ..ArtistSubmission::default()
        };

        let record = normalize(&input).unwrap();

        assert_eq!(record.streaming_platforms.len(), 1);
        assert_eq!(record.platform, "SoundCloud");
    }

    #[test]
    fn social_links_are_trimmed() {
        let input = ArtistSubmission {
            social: SocialLinks {
                instagram: Some("  https://instagram.com/band ".to_owned()),
                website: Some("   ".to_owned()),
                ..SocialLinks::default()
            },
            ..submission_with_platforms(vec![platform(None, "https://tidal.com/a")])
        };

        let record = normalize(&input).unwrap();

        assert_eq!(record.social.instagram.as_deref(), Some("https://instagram.com/band"));
        assert_eq!(record.social.website, None);
    }

    #[test]
    fn normalize_is_idempotent() {
        let input = ArtistSubmission {
            name: Some("  Khruangbin ".to_owned()),
            genre: Some("custom".to_owned()),
            custom_genre: Some("THAI  funk".to_owned()),
            image_url: Some(Some("https://i.ibb.co/abc/cover.jpg".to_owned())),
            created_by: Some("user-1".to_owned()),
            creator_name: Some("Ana".to_owned()),
            is_own_music: Some(true),
            ..submission_with_platforms(vec![
                platform(None, "https://open.spotify.com/artist/k"),
                platform(Some("Bandcamp"), "https://k.bandcamp.com"),
            ])
        };

        let once = normalize(&input).unwrap();
        let twice = normalize(&ArtistSubmission::from(&once)).unwrap();

        assert_eq!(once.genre, "Thai  Funk");
        assert_eq!(once, twice);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("lo fi beats"), "Lo Fi Beats");
        assert_eq!(title_case("dREAM  pop"), "Dream  Pop");
        assert_eq!(title_case("trip-hop\tNOIR"), "Trip-hop\tnoir");
        assert_eq!(title_case(""), "");
    }
}
