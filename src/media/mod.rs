use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod collector;
pub mod probe;
pub mod transcoder;

pub use collector::collect_stream;
pub use probe::probe;
pub use transcoder::{FfmpegTranscoder, Transcoder};

/// MIME type reported by the prober
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    pub const MPEG: &'static str = "audio/mpeg";

    pub fn new(mime: impl Into<String>) -> Self {
        Self(mime.into())
    }

    pub fn mpeg() -> Self {
        Self::new(Self::MPEG)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Any `audio/*` type, including containers such as `audio/webm`
    pub fn is_audio(&self) -> bool {
        self.0.starts_with("audio/")
    }

    /// Exactly `audio/mpeg`, the only type accepted after re-encoding
    pub fn is_mp3(&self) -> bool {
        self.0 == Self::MPEG
    }

    /// Whether a fetched asset of this type has to go through ffmpeg before upload
    pub fn needs_transcode(&self) -> bool {
        !self.is_audio()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaType {
    fn from(mime: &str) -> Self {
        Self::new(mime)
    }
}

/// Audio buffer together with its probed type
#[derive(Debug, Clone)]
pub struct AudioAsset {
    pub data: Bytes,
    pub media_type: MediaType,
    /// Set when the buffer is ffmpeg output rather than the fetched stream
    pub transcoded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_decision_for_canonical_types() {
        assert!(!MediaType::from("audio/mpeg").needs_transcode());
        assert!(!MediaType::from("audio/webm").needs_transcode());
        assert!(MediaType::from("video/mp4").needs_transcode());
        assert!(MediaType::from("video/webm").needs_transcode());
    }

    #[test]
    fn test_only_exact_mpeg_counts_as_mp3() {
        assert!(MediaType::mpeg().is_mp3());
        assert!(!MediaType::from("audio/mpeg3").is_mp3());
        assert!(!MediaType::from("audio/webm").is_mp3());
    }
}
