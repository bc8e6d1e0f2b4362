use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::TranscriptionResult;
use crate::utils::{format_duration, format_file_size};

/// Render a result in the requested format
pub fn render(result: &TranscriptionResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(result)),
        OutputFormat::Json => format_as_json(result),
    }
}

/// Title and thumbnail header followed by the transcript
pub fn format_as_text(result: &TranscriptionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Title: {}", result.title);
    if !result.thumbnail_url.is_empty() {
        let _ = writeln!(out, "Thumbnail: {}", result.thumbnail_url);
    }
    if let Some(duration) = result.metadata.audio_duration {
        let _ = writeln!(out, "Duration: {}", format_duration(duration));
    }
    let _ = writeln!(
        out,
        "Audio: {} ({}{})",
        format_file_size(result.metadata.audio_bytes as u64),
        result.metadata.media_type,
        if result.metadata.transcoded { ", re-encoded" } else { "" }
    );
    out.push('\n');
    out.push_str(result.text.trim());
    out
}

pub fn format_as_json(result: &TranscriptionResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize transcription result")
}

/// Save transcription result to file
pub async fn save_to_file(result: &TranscriptionResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::tokio::create_dir_all(parent).await?;
    }
    fs_err::tokio::write(path, content).await?;
    Ok(())
}

/// Print transcription result to console
pub fn print_to_console(result: &TranscriptionResult, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    println!("{}", content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaType;
    use crate::transcribe::TranscriptionMetadata;

    fn sample() -> TranscriptionResult {
        TranscriptionResult {
            title: "A talk".to_string(),
            thumbnail_url: "https://i.ytimg.com/vi/x/maxresdefault.jpg".to_string(),
            text: "  hello there  ".to_string(),
            metadata: TranscriptionMetadata {
                video_id: "dQw4w9WgXcQ".to_string(),
                job_id: "job-1".to_string(),
                media_type: MediaType::mpeg(),
                transcoded: true,
                audio_bytes: 2048,
                audio_duration: Some(95.0),
                confidence: Some(0.93),
                language: Some("en_us".to_string()),
                processing_duration: 12.5,
                completed_at: chrono::Utc::now(),
            },
        }
    }

    #[test]
    fn test_text_format() {
        let text = format_as_text(&sample());
        assert!(text.starts_with("Title: A talk\n"));
        assert!(text.contains("Thumbnail: https://i.ytimg.com/vi/x/maxresdefault.jpg"));
        assert!(text.contains("Duration: 1m 35s"));
        assert!(text.contains("Audio: 2.0 KB (audio/mpeg, re-encoded)"));
        assert!(text.ends_with("\n\nhello there"));
    }

    #[test]
    fn test_text_format_without_thumbnail() {
        let mut result = sample();
        result.thumbnail_url.clear();
        result.metadata.audio_duration = None;
        let text = format_as_text(&result);
        assert!(!text.contains("Thumbnail:"));
        assert!(!text.contains("Duration:"));
    }

    #[test]
    fn test_json_format() {
        let json = format_as_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "A talk");
        assert_eq!(value["metadata"]["media_type"], "audio/mpeg");
        assert_eq!(value["metadata"]["job_id"], "job-1");
    }

    #[tokio::test]
    async fn test_save_to_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");

        save_to_file(&sample(), &path, &OutputFormat::Text).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("hello there"));
    }
}
