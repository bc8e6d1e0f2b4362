use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::{multipart, Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ApiKey, AssemblyAiConfig};
use crate::media::MediaType;
use crate::{Result, ScribeError};

/// Opaque transcript id issued by AssemblyAI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    Unknown(String),
}

impl From<String> for JobStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            _ => JobStatus::Unknown(status),
        }
    }
}

impl JobStatus {
    /// Still queued or processing on the provider side
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Unknown(other) => other,
        }
    }
}

/// Transcript resource as returned by `GET /v2/transcript/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptJob {
    pub id: JobId,
    pub status: JobStatus,
    pub text: Option<String>,
    pub error: Option<String>,
    pub audio_duration: Option<f64>,
    pub confidence: Option<f64>,
    pub language_code: Option<String>,
}

impl TranscriptJob {
    /// Minimal job record, mostly for stubbing the service
    pub fn with_status(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: JobId::new(id),
            status,
            text: None,
            error: None,
            audio_duration: None,
            confidence: None,
            language_code: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

/// Hosted transcription service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Upload the audio and create a transcription job for it
    async fn submit(&self, audio: Bytes, media_type: &MediaType) -> Result<JobId>;

    /// Fetch the current state of a job
    async fn fetch(&self, job_id: &JobId) -> Result<TranscriptJob>;
}

/// AssemblyAI v2 REST client
pub struct AssemblyAiClient {
    client: Client,
    base_url: String,
    api_key: ApiKey,
}

impl AssemblyAiClient {
    pub fn new(base_url: impl Into<String>, api_key: ApiKey) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &AssemblyAiConfig, api_key: ApiKey) -> Self {
        Self::new(config.base_url.clone(), api_key)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    /// Upload audio and return the provider's asset URL
    async fn upload(&self, audio: Bytes, media_type: &MediaType) -> Result<String> {
        let size = audio.len();
        let part = multipart::Part::stream_with_length(audio, size as u64)
            .file_name("audio.mp3")
            .mime_str(media_type.as_str())
            .with_context(|| format!("Unusable MIME type {}", media_type))?;
        let form = multipart::Form::new().part("audio", part);

        tracing::debug!(bytes = size, mime = %media_type, "Uploading audio to AssemblyAI");

        let response = self
            .client
            .post(self.endpoint("upload"))
            .header(AUTHORIZATION, self.api_key.expose())
            .multipart(form)
            .send()
            .await
            .context("Failed to upload audio to AssemblyAI")?;

        let upload: UploadResponse = check_status(response, "upload")
            .await?
            .json()
            .await
            .context("Failed to parse upload response")?;

        Ok(upload.upload_url)
    }
}

#[async_trait]
impl TranscriptionService for AssemblyAiClient {
    async fn submit(&self, audio: Bytes, media_type: &MediaType) -> Result<JobId> {
        let audio_url = self.upload(audio, media_type).await?;

        let response = self
            .client
            .post(self.endpoint("transcript"))
            .header(AUTHORIZATION, self.api_key.expose())
            .json(&TranscriptRequest {
                audio_url: &audio_url,
            })
            .send()
            .await
            .context("Failed to create transcription job")?;

        let job: TranscriptJob = check_status(response, "transcript")
            .await?
            .json()
            .await
            .context("Failed to parse transcription job")?;

        tracing::info!(job_id = %job.id, status = job.status.as_str(), "Transcription job created");

        Ok(job.id)
    }

    async fn fetch(&self, job_id: &JobId) -> Result<TranscriptJob> {
        let response = self
            .client
            .get(self.endpoint(&format!("transcript/{}", job_id)))
            .header(AUTHORIZATION, self.api_key.expose())
            .send()
            .await
            .context("Failed to get transcription job status")?;

        let job = check_status(response, "transcript status")
            .await?
            .json()
            .await
            .context("Failed to parse transcription job")?;

        Ok(job)
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(ScribeError::TranscriptionFailed(format!("{} request returned {}: {}", what, status, body)).into())
}
