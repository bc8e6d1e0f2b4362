use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::{MediaConfig, TranscodeMode};
use crate::{Result, ScribeError};

const STDERR_TAIL: usize = 800;

/// Converts an arbitrary audio container into MP3
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn to_mp3(&self, input: Bytes) -> Result<Bytes>;
}

/// ffmpeg subprocess transcoder
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    mode: TranscodeMode,
    temp_dir: Option<PathBuf>,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>, mode: TranscodeMode) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            mode,
            temp_dir: None,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            mode: config.transcode_mode,
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Output half of the ffmpeg command line, shared by both modes
    fn mp3_args() -> [&'static str; 12] {
        [
            "-vn", // No video
            "-acodec", "libmp3lame",
            "-ab", "128k", // Good quality for transcription
            "-ar", "44100", // Standard sample rate
            "-f", "mp3",
            "-loglevel", "error",
            "pipe:1",
        ]
    }

    async fn transcode_piped(&self, input: Bytes) -> Result<Output> {
        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-i", "pipe:0"])
            .args(Self::mp3_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.ffmpeg_path))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ScribeError::TranscodeFailed("ffmpeg stdin unavailable".into()))?;

        // Feed stdin while stdout drains, otherwise both pipes can fill up
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await?;

        match writer.await {
            Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                tracing::warn!(error = %e, "Writing to ffmpeg stdin failed");
            }
            Err(e) => tracing::warn!(error = %e, "ffmpeg stdin writer panicked"),
            _ => {}
        }

        Ok(output)
    }

    async fn transcode_from_file(&self, input: Bytes) -> Result<Output> {
        // Random per-call name; the file is removed when `source` drops, on every path
        let mut builder = tempfile::Builder::new();
        builder.prefix("tubescribe-").suffix(".media");
        let source = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("Failed to create temporary transcoder input")?;

        tokio::fs::write(source.path(), &input)
            .await
            .context("Failed to write temporary transcoder input")?;

        tracing::debug!(path = %source.path().display(), bytes = input.len(), "Transcoding from temp file");

        let output = self.run_on_path(source.path()).await;
        drop(source);
        output
    }

    async fn run_on_path(&self, path: &Path) -> Result<Output> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-hide_banner")
            .arg("-i")
            .arg(path)
            .args(Self::mp3_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.ffmpeg_path))?;

        Ok(output)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_mp3(&self, input: Bytes) -> Result<Bytes> {
        let input_len = input.len();
        tracing::info!(bytes = input_len, mode = ?self.mode, "Re-encoding audio to MP3");

        let output = match self.mode {
            TranscodeMode::Pipe => self.transcode_piped(input).await,
            TranscodeMode::TempFile => self.transcode_from_file(input).await,
        }
        .map_err(|e| ScribeError::TranscodeFailed(format!("{:#}", e)))?;

        if !output.status.success() {
            return Err(ScribeError::TranscodeFailed(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            ))
            .into());
        }

        if output.stdout.is_empty() {
            return Err(ScribeError::TranscodeFailed(format!(
                "ffmpeg produced no output: {}",
                stderr_tail(&output.stderr)
            ))
            .into());
        }

        tracing::info!(input_bytes = input_len, output_bytes = output.stdout.len(), "ffmpeg finished processing");

        Ok(Bytes::from(output.stdout))
    }
}

/// Outcome of `ffmpeg -version`, mirroring what the diagnostics endpoint reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionReport {
    Stdout(String),
    Stderr(String),
    Error(String),
}

pub async fn ffmpeg_version(ffmpeg_path: &str) -> VersionReport {
    let output = Command::new(ffmpeg_path)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .await;

    match output {
        Err(e) => VersionReport::Error(format!("{}: {}", ffmpeg_path, e)),
        Ok(out) if !out.status.success() => VersionReport::Error(format!(
            "{} exited with {}: {}",
            ffmpeg_path,
            out.status,
            stderr_tail(&out.stderr)
        )),
        Ok(out) if !out.stderr.is_empty() => {
            VersionReport::Stderr(String::from_utf8_lossy(&out.stderr).into_owned())
        }
        Ok(out) => VersionReport::Stdout(String::from_utf8_lossy(&out.stdout).into_owned()),
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map_or(0, |(i, _)| i);
    trimmed[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::probe;

    async fn ffmpeg_available() -> bool {
        matches!(ffmpeg_version("ffmpeg").await, VersionReport::Stdout(_))
    }

    /// One second of silence as 16-bit mono WAV
    fn silent_wav() -> Bytes {
        let sample_rate: u32 = 8000;
        let data_len: u32 = sample_rate * 2;
        let mut buf = Vec::with_capacity(44 + data_len as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());
        buf.resize(44 + data_len as usize, 0);
        Bytes::from(buf)
    }

    #[test]
    fn test_stderr_tail_keeps_end() {
        let long = "x".repeat(STDERR_TAIL * 2) + "final line";
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.ends_with("final line"));
        assert!(tail.chars().count() <= STDERR_TAIL + 1);
        assert_eq!(stderr_tail(b"  short \n"), "short");
    }

    #[tokio::test]
    async fn test_missing_binary_is_transcode_failure() {
        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg", TranscodeMode::Pipe);
        let err = transcoder.to_mp3(silent_wav()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::TranscodeFailed(_))
        ));

        let report = ffmpeg_version("/nonexistent/ffmpeg").await;
        assert!(matches!(report, VersionReport::Error(_)));
    }

    #[tokio::test]
    async fn test_temp_file_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg", TranscodeMode::TempFile);
        transcoder.temp_dir = Some(dir.path().to_path_buf());

        assert!(transcoder.to_mp3(silent_wav()).await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_both_modes_produce_mp3() {
        if !ffmpeg_available().await {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        for mode in [TranscodeMode::Pipe, TranscodeMode::TempFile] {
            let mut transcoder = FfmpegTranscoder::new("ffmpeg", mode);
            transcoder.temp_dir = Some(dir.path().to_path_buf());

            let mp3 = transcoder.to_mp3(silent_wav()).await.unwrap();
            assert_eq!(probe(&mp3).map(|t| t.is_mp3()), Some(true), "mode {:?}", mode);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_garbage_input_fails() {
        if !ffmpeg_available().await {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }

        let transcoder = FfmpegTranscoder::new("ffmpeg", TranscodeMode::TempFile);
        let err = transcoder
            .to_mp3(Bytes::from_static(b"definitely not audio"))
            .await
            .unwrap_err();
        assert!(format!("{}", err).contains("Transcoding failed"));
    }
}
