use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{future, stream, StreamExt};
use serde::Deserialize;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use super::{AudioStream, Thumbnail, VideoId, VideoMetadata, VideoSource};
use crate::{Result, ScribeError};

/// Subset of `yt-dlp --dump-json` output
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtDlpThumbnail>,
    thumbnail: Option<String>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct YtDlpThumbnail {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

impl From<YtDlpInfo> for VideoMetadata {
    fn from(info: YtDlpInfo) -> Self {
        let mut thumbnails: Vec<Thumbnail> = info
            .thumbnails
            .into_iter()
            .map(|t| Thumbnail {
                url: t.url,
                width: t.width,
                height: t.height,
            })
            .collect();

        if thumbnails.is_empty() {
            if let Some(url) = info.thumbnail {
                thumbnails.push(Thumbnail {
                    url,
                    width: None,
                    height: None,
                });
            }
        }

        VideoMetadata {
            title: info.title.unwrap_or_default(),
            thumbnails,
            duration: info.duration,
        }
    }
}

/// YouTube audio extractor using yt-dlp
pub struct YoutubeExtractor {
    yt_dlp_path: String,
}

impl YoutubeExtractor {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, video: &VideoId) -> Result<YtDlpInfo> {
        tracing::debug!(video_id = %video, "Extracting video info");

        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--dump-json",
                "--no-playlist",
                "--skip-download",
                "--no-warnings",
            ])
            .arg(video.watch_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ScribeError::MetadataFetch(format!("{}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(ScribeError::MetadataFetch(format!("yt-dlp failed: {}", error.trim())).into());
        }

        let info: YtDlpInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScribeError::MetadataFetch(format!("unreadable yt-dlp output: {}", e)))?;

        Ok(info)
    }
}

#[async_trait]
impl VideoSource for YoutubeExtractor {
    async fn fetch_metadata(&self, video: &VideoId) -> Result<VideoMetadata> {
        let info = self.get_video_info(video).await?;
        Ok(info.into())
    }

    async fn open_audio_stream(&self, video: &VideoId) -> Result<AudioStream> {
        tracing::debug!(video_id = %video, "Opening audio-only stream");

        let mut child = Command::new(&self.yt_dlp_path)
            .args([
                // Best audio-only format, written to stdout as-is
                "--format", "bestaudio",
                "--output", "-",
                "--no-playlist",
                "--no-part",
                "--quiet",
                "--no-progress",
            ])
            .arg(video.watch_url())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScribeError::AudioFetch(format!("{}: {}", self.yt_dlp_path, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScribeError::AudioFetch("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScribeError::AudioFetch("yt-dlp stderr unavailable".into()))?;

        // Drain stderr on its own task so a chatty process never blocks on a full pipe
        let stderr_task = tokio::spawn(drain_lossy(stderr));

        // Surface a failed exit as a trailing stream error once stdout is exhausted
        let exit = stream::once(exit_error(child, stderr_task)).filter_map(future::ready);

        Ok(ReaderStream::new(stdout).chain(exit).boxed())
    }

    fn platform_name(&self) -> &'static str {
        "YouTube"
    }
}

/// Read to EOF, keeping whatever was read before an error and replacing invalid UTF-8
async fn drain_lossy<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

async fn exit_error(
    mut child: Child,
    stderr_task: JoinHandle<String>,
) -> Option<io::Result<Bytes>> {
    let status = match child.wait().await {
        Ok(status) => status,
        Err(e) => return Some(Err(e)),
    };
    if status.success() {
        return None;
    }

    let stderr = stderr_task.await.unwrap_or_default();
    Some(Err(io::Error::other(format!(
        "yt-dlp exited with {}: {}",
        status,
        stderr.trim()
    ))))
}

impl Default for YoutubeExtractor {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}
