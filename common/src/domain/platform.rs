use serde::{Deserialize, Serialize};

/// Whether a link points at a place to listen or a place to follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Streaming,
    Social,
}

/// Every platform name the classifier can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Spotify,
    #[serde(rename = "Apple Music")]
    AppleMusic,
    Bandcamp,
    SoundCloud,
    #[serde(rename = "Amazon Music")]
    AmazonMusic,
    Pandora,
    Deezer,
    Tidal,
    #[serde(rename = "Google Play Music")]
    GooglePlayMusic,
    #[serde(rename = "iHeartRadio")]
    IHeartRadio,
    Audiomack,
    Mixcloud,
    Napster,
    Qobuz,
    YouTube,
    Instagram,
    Facebook,
    X,
    TikTok,
    Discord,
    Twitch,
    LinkedIn,
    Pinterest,
    Reddit,
    Snapchat,
    Telegram,
    Website,
    Other,
}

/// Derived classification of a link, recomputed on every edit and never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub name: Platform,
    #[serde(rename = "type")]
    pub platform_type: PlatformType,
}

// Checked top to bottom, first match wins. Streaming rows precede social rows
// and the order must not change: stored classifications depend on it.
const PATTERNS: &[(&[&str], Platform, PlatformType)] = &[
    (&["spotify.com"], Platform::Spotify, PlatformType::Streaming),
    (&["music.apple.com", "itunes.apple.com"], Platform::AppleMusic, PlatformType::Streaming),
    (&["bandcamp.com"], Platform::Bandcamp, PlatformType::Streaming),
    (&["soundcloud.com"], Platform::SoundCloud, PlatformType::Streaming),
    (&["music.amazon.com", "amazon.com/music"], Platform::AmazonMusic, PlatformType::Streaming),
    (&["pandora.com"], Platform::Pandora, PlatformType::Streaming),
    (&["deezer.com"], Platform::Deezer, PlatformType::Streaming),
    (&["tidal.com"], Platform::Tidal, PlatformType::Streaming),
    (&["play.google.com/music", "music.google.com"], Platform::GooglePlayMusic, PlatformType::Streaming),
    (&["iheart.com"], Platform::IHeartRadio, PlatformType::Streaming),
    (&["audiomack.com"], Platform::Audiomack, PlatformType::Streaming),
    (&["mixcloud.com"], Platform::Mixcloud, PlatformType::Streaming),
    (&["napster.com"], Platform::Napster, PlatformType::Streaming),
    (&["qobuz.com"], Platform::Qobuz, PlatformType::Streaming),
    (&["youtube.com", "youtu.be"], Platform::YouTube, PlatformType::Social),
    (&["instagram.com"], Platform::Instagram, PlatformType::Social),
    (&["facebook.com", "fb.com"], Platform::Facebook, PlatformType::Social),
    (&["twitter.com", "x.com"], Platform::X, PlatformType::Social),
    (&["tiktok.com"], Platform::TikTok, PlatformType::Social),
    (&["discord.com", "discord.gg"], Platform::Discord, PlatformType::Social),
    (&["twitch.tv"], Platform::Twitch, PlatformType::Social),
    (&["linkedin.com"], Platform::LinkedIn, PlatformType::Social),
    (&["pinterest.com"], Platform::Pinterest, PlatformType::Social),
    (&["reddit.com"], Platform::Reddit, PlatformType::Social),
    (&["snapchat.com"], Platform::Snapchat, PlatformType::Social),
    (&["t.me", "telegram.me"], Platform::Telegram, PlatformType::Social),
];

// implementations

impl Platform {
    /// Display name, identical to the serialized form.
    pub const fn name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::AppleMusic => "Apple Music",
            Platform::Bandcamp => "Bandcamp",
            Platform::SoundCloud => "SoundCloud",
            Platform::AmazonMusic => "Amazon Music",
            Platform::Pandora => "Pandora",
            Platform::Deezer => "Deezer",
            Platform::Tidal => "Tidal",
            Platform::GooglePlayMusic => "Google Play Music",
            Platform::IHeartRadio => "iHeartRadio",
            Platform::Audiomack => "Audiomack",
            Platform::Mixcloud => "Mixcloud",
            Platform::Napster => "Napster",
            Platform::Qobuz => "Qobuz",
            Platform::YouTube => "YouTube",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::X => "X",
            Platform::TikTok => "TikTok",
            Platform::Discord => "Discord",
            Platform::Twitch => "Twitch",
            Platform::LinkedIn => "LinkedIn",
            Platform::Pinterest => "Pinterest",
            Platform::Reddit => "Reddit",
            Platform::Snapchat => "Snapchat",
            Platform::Telegram => "Telegram",
            Platform::Website => "Website",
            Platform::Other => "Other",
        }
    }
}

impl PlatformInfo {
    const fn new(name: Platform, platform_type: PlatformType) -> Self {
        Self {
            name,
            platform_type,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.platform_type == PlatformType::Streaming
    }
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self::new(Platform::Other, PlatformType::Streaming)
    }
}

/// Classifies a link by substring match against the known platforms.
///
/// Never fails: anything unrecognised that still carries a `//` is treated as
/// a personal website, everything else as an "Other" streaming link.
pub fn classify(url: &str) -> PlatformInfo {
    let url_lower = url.to_lowercase();

    let matched = PATTERNS.iter().find(|(needles, _, _)| {
        needles.iter().any(|needle| url_lower.contains(needle))
    });

    match matched {
        Some((_, name, platform_type)) => PlatformInfo::new(*name, *platform_type),
        None if url.contains("//") => PlatformInfo::new(Platform::Website, PlatformType::Social),
        None => PlatformInfo::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spotify_links_are_streaming() {
        for url in [
            "https://open.spotify.com/artist/x",
            "HTTPS://OPEN.SPOTIFY.COM/album/1",
            "spotify.com",
        ] {
            assert_eq!(
                classify(url),
                PlatformInfo::new(Platform::Spotify, PlatformType::Streaming)
            );
        }
    }

    #[test]
    fn social_links_are_social() {
        let info = classify("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(info.name, Platform::YouTube);
        assert_eq!(info.platform_type, PlatformType::Social);

        assert_eq!(classify("https://t.me/band").name, Platform::Telegram);
        assert_eq!(classify("https://twitter.com/band").name, Platform::X);
    }

    #[test]
    fn streaming_wins_over_social() {
        let info = classify("https://youtube.com/redirect?to=music.apple.com/x");
        assert_eq!(info.name, Platform::AppleMusic);
        assert!(info.is_streaming());
    }

    #[test]
    fn unknown_url_with_scheme_is_website() {
        assert_eq!(
            classify("https://my-band.example.org"),
            PlatformInfo::new(Platform::Website, PlatformType::Social)
        );
    }

    #[test]
    fn garbage_falls_back_to_other() {
        assert_eq!(classify("not a url"), PlatformInfo::default());
        assert_eq!(classify(""), PlatformInfo::default());
    }

    #[test]
    fn serializes_display_names() {
        let json = serde_json::to_value(classify("https://music.apple.com/us/artist/1")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Apple Music", "type": "streaming"}));
    }
}
