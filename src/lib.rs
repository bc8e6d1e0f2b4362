//! tubescribe - YouTube audio transcription backend
//!
//! This library fetches the audio track of a YouTube video, normalizes it to MP3 when the
//! source container is not audio-typed, transcribes it through AssemblyAI and exposes the
//! whole pipeline over a small HTTP API that also serves the article front end.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod media;
pub mod output;
pub mod server;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{VideoMetadata, VideoSource};
pub use media::MediaType;
pub use transcribe::{TranscriptionPipeline, TranscriptionResult};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the transcription backend
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch video metadata: {0}")]
    MetadataFetch(String),

    #[error("Failed to fetch audio: {0}")]
    AudioFetch(String),

    #[error("Audio stream exceeded the {limit} byte limit")]
    AudioTooLarge { limit: u64 },

    #[error("Could not detect the media type of a {0} byte buffer")]
    UndetectedFormat(usize),

    #[error("Invalid audio file type after re-encoding: expected {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Transcription job {job_id} did not finish within {waited_secs}s")]
    PollTimeout { job_id: String, waited_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}
