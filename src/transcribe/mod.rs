use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::extractors::{VideoId, VideoSource, YoutubeExtractor};
use crate::media::{collect_stream, probe, AudioAsset, FfmpegTranscoder, MediaType, Transcoder};
use crate::{Result, ScribeError};

pub mod assembly;
pub mod processor;

pub use assembly::{AssemblyAiClient, JobId, JobStatus, TranscriptJob, TranscriptionService};

/// Transcription result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Video title
    pub title: String,

    /// Highest resolution thumbnail, empty when the video has none
    pub thumbnail_url: String,

    /// The transcribed text
    pub text: String,

    /// Transcription metadata
    pub metadata: TranscriptionMetadata,
}

/// Metadata about the transcription process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    pub video_id: String,

    /// AssemblyAI transcript id
    pub job_id: String,

    /// Type of the audio that was uploaded
    pub media_type: MediaType,

    /// Whether ffmpeg re-encoded the fetched audio
    pub transcoded: bool,

    /// Size of the uploaded audio in bytes
    pub audio_bytes: usize,

    /// Audio duration in seconds as reported by the provider
    pub audio_duration: Option<f64>,

    /// Overall confidence score
    pub confidence: Option<f64>,

    pub language: Option<String>,

    /// Wall-clock time for the whole pipeline in seconds
    pub processing_duration: f64,

    /// Timestamp when transcription completed
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Tunables the pipeline reads from [`Config`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
    pub max_audio_bytes: Option<u64>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            max_audio_bytes: config.media.max_audio_bytes,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Main transcription pipeline
pub struct TranscriptionPipeline {
    source: Arc<dyn VideoSource>,
    transcoder: Arc<dyn Transcoder>,
    service: Arc<dyn TranscriptionService>,
    settings: PipelineSettings,
}

impl TranscriptionPipeline {
    /// Create a pipeline backed by yt-dlp, ffmpeg and AssemblyAI
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?.clone();

        Ok(Self::from_parts(
            Arc::new(YoutubeExtractor::new(config.media.yt_dlp_path.clone())),
            Arc::new(FfmpegTranscoder::from_config(&config.media)),
            Arc::new(AssemblyAiClient::from_config(&config.assemblyai, api_key)),
            PipelineSettings::from_config(config),
        ))
    }

    pub fn from_parts(
        source: Arc<dyn VideoSource>,
        transcoder: Arc<dyn Transcoder>,
        service: Arc<dyn TranscriptionService>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            transcoder,
            service,
            settings,
        }
    }

    /// Transcribe the audio of a YouTube video
    pub async fn transcribe_from_url(&self, url: &str) -> Result<TranscriptionResult> {
        let start_time = Instant::now();

        let video = VideoId::parse(url)?;
        tracing::info!(url, video_id = %video, platform = self.source.platform_name(), "Starting transcription");

        let metadata = self.source.fetch_metadata(&video).await?;
        let thumbnail_url = metadata
            .best_thumbnail()
            .map(|t| t.url.clone())
            .unwrap_or_default();

        let raw = self.download_audio(&video).await?;
        let asset = self.prepare_audio(raw).await?;

        let job_id = self
            .service
            .submit(asset.data.clone(), &asset.media_type)
            .await?;

        let job = self.wait_for_transcription(job_id).await?;

        Ok(TranscriptionResult {
            title: metadata.title,
            thumbnail_url,
            text: job.text.unwrap_or_default(),
            metadata: TranscriptionMetadata {
                video_id: video.to_string(),
                job_id: job.id.to_string(),
                media_type: asset.media_type,
                transcoded: asset.transcoded,
                audio_bytes: asset.data.len(),
                audio_duration: job.audio_duration.or(metadata.duration),
                confidence: job.confidence,
                language: job.language_code,
                processing_duration: start_time.elapsed().as_secs_f64(),
                completed_at: chrono::Utc::now(),
            },
        })
    }

    /// Collect the whole audio stream into memory
    async fn download_audio(&self, video: &VideoId) -> Result<Bytes> {
        let stream = self.source.open_audio_stream(video).await?;

        let audio = collect_stream(stream, self.settings.max_audio_bytes)
            .await
            .map_err(|e| match e.downcast::<ScribeError>() {
                Ok(known) => known,
                Err(other) => ScribeError::AudioFetch(format!("{:#}", other)),
            })?;

        tracing::info!(video_id = %video, bytes = audio.len(), "Audio downloaded");
        Ok(audio)
    }

    /// Probe the fetched audio and re-encode it to MP3 when it is not audio-typed.
    ///
    /// The transcoder runs at most once. Its output has to probe as exactly `audio/mpeg`.
    pub async fn prepare_audio(&self, raw: Bytes) -> Result<AudioAsset> {
        let media_type = probe(&raw).ok_or(ScribeError::UndetectedFormat(raw.len()))?;
        tracing::info!(bytes = raw.len(), mime = %media_type, "Detected file type");

        if !media_type.needs_transcode() {
            return Ok(AudioAsset {
                data: raw,
                media_type,
                transcoded: false,
            });
        }

        let mp3 = self.transcoder.to_mp3(raw).await?;

        match probe(&mp3) {
            Some(mp3_type) if mp3_type.is_mp3() => {
                tracing::info!(bytes = mp3.len(), mime = %mp3_type, "Re-encoded audio verified");
                Ok(AudioAsset {
                    data: mp3,
                    media_type: mp3_type,
                    transcoded: true,
                })
            }
            other => Err(ScribeError::FormatMismatch {
                expected: MediaType::MPEG.to_string(),
                actual: other.map_or_else(|| "undetected".to_string(), |t| t.to_string()),
            }
            .into()),
        }
    }

    /// Wait for transcription job completion
    async fn wait_for_transcription(&self, job_id: JobId) -> Result<TranscriptJob> {
        processor::TranscriptionProcessor::new(
            Arc::clone(&self.service),
            job_id,
            self.settings.poll_interval,
            self.settings.poll_timeout,
        )
        .wait_for_completion()
        .await
    }
}
