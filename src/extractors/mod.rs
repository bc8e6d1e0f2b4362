use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub mod youtube;

pub use youtube::YoutubeExtractor;

use crate::{Result, ScribeError};

/// Hosts that carry the video id in the `v` query parameter
const QUERY_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "gaming.youtube.com",
];

/// Path prefixes on youtube.com that carry the id as the next segment
const PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live"];

const VIDEO_ID_LEN: usize = 11;

/// Raw audio bytes as they arrive from the video host
pub type AudioStream = BoxStream<'static, std::io::Result<Bytes>>;

/// A validated 11-character YouTube video id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    /// Extract the video id from any supported YouTube URL form.
    ///
    /// Accepts `watch?v=` URLs on the YouTube hosts, `youtu.be/<id>` short links and the
    /// `/embed/`, `/v/`, `/shorts/` and `/live/` paths. A longer id is cut to 11 characters
    /// before validation, as YouTube itself ignores trailing garbage.
    pub fn parse(input: &str) -> std::result::Result<Self, ScribeError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ScribeError::InvalidUrl(format!("{} ({})", reason, trimmed));

        let parsed = Url::parse(trimmed).map_err(|_| invalid("not a URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("URL must use HTTP or HTTPS protocol"));
        }

        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        let query_id = parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|v| !v.is_empty());

        let id = match query_id {
            Some(id) if QUERY_HOSTS.contains(&host.as_str()) => id,
            None if host == "youtu.be" => first_segment(&parsed, 0),
            None if QUERY_HOSTS[..2].contains(&host.as_str()) => {
                let prefix = first_segment(&parsed, 0);
                if PATH_PREFIXES.contains(&prefix.as_str()) {
                    first_segment(&parsed, 1)
                } else {
                    String::new()
                }
            }
            _ if !QUERY_HOSTS.contains(&host.as_str()) && host != "youtu.be" => {
                return Err(invalid("not a YouTube domain"));
            }
            _ => String::new(),
        };

        if id.is_empty() {
            return Err(invalid("no video id found"));
        }

        let id: String = id.chars().take(VIDEO_ID_LEN).collect();
        let valid = id.chars().count() == VIDEO_ID_LEN
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(invalid("malformed video id"));
        }

        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL handed to the extraction tool
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn first_segment(url: &Url, index: usize) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.nth(index))
        .unwrap_or_default()
        .to_string()
}

/// Video metadata needed for the response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,

    /// Ordered from lowest to highest resolution
    pub thumbnails: Vec<Thumbnail>,

    /// Duration in seconds if known
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl VideoMetadata {
    /// The last thumbnail, which the host lists as the highest resolution
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnails.last()
    }
}

/// A source of video metadata and audio streams
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Fetch title and thumbnails
    async fn fetch_metadata(&self, video: &VideoId) -> Result<VideoMetadata>;

    /// Open an audio-only byte stream
    async fn open_audio_stream(&self, video: &VideoId) -> Result<AudioStream>;

    /// Get the name of this platform
    fn platform_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> Option<String> {
        VideoId::parse(url).ok().map(|id| id.as_str().to_string())
    }

    #[test]
    fn test_watch_urls() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("http://youtube.com/watch?feature=share&v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://music.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("  https://www.youtube.com/watch?v=dQw4w9WgXcQ  ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_short_and_path_urls() {
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ?si=abc").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/v/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(id("https://www.youtube.com/live/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_long_id_is_truncated() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQextra").as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_rejected_urls() {
        assert!(id("").is_none());
        assert!(id("not a url").is_none());
        assert!(id("ftp://www.youtube.com/watch?v=dQw4w9WgXcQ").is_none());
        assert!(id("https://vimeo.com/watch?v=dQw4w9WgXcQ").is_none());
        assert!(id("https://www.youtube.com/").is_none());
        assert!(id("https://www.youtube.com/channel/UC38IQsAvIsxxjztdMZQtwHA").is_none());
        assert!(id("https://www.youtube.com/watch?v=short").is_none());
        assert!(id("https://www.youtube.com/watch?v=dQw4w9WgX!Q").is_none());
        assert!(id("https://youtu.be/").is_none());
    }

    #[test]
    fn test_invalid_url_error_kind() {
        let err = VideoId::parse("https://example.com/video").unwrap_err();
        assert!(matches!(err, ScribeError::InvalidUrl(_)));
        assert!(err.to_string().contains("not a YouTube domain"));
    }

    #[test]
    fn test_best_thumbnail_is_last() {
        let thumb = |url: &str| Thumbnail {
            url: url.to_string(),
            width: None,
            height: None,
        };
        let metadata = VideoMetadata {
            title: "t".into(),
            thumbnails: vec![thumb("small"), thumb("medium"), thumb("large")],
            duration: None,
        };
        assert_eq!(metadata.best_thumbnail().map(|t| t.url.as_str()), Some("large"));
        assert!(VideoMetadata::default().best_thumbnail().is_none());
    }
}
