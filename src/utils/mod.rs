use tokio::process::Command;

use crate::config::MediaConfig;

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Format duration in human-readable format
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// An external tool the pipeline shells out to
#[derive(Debug, Clone)]
pub struct ToolStatus {
    pub name: &'static str,
    pub path: String,
    pub purpose: &'static str,
    /// First line of the version output, `None` when the tool could not run
    pub version: Option<String>,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// Probe the configured yt-dlp and ffmpeg binaries
pub async fn check_dependencies(media: &MediaConfig) -> Vec<ToolStatus> {
    let (yt_dlp, ffmpeg) = tokio::join!(
        tool_version(&media.yt_dlp_path, "--version"),
        tool_version(&media.ffmpeg_path, "-version"),
    );

    vec![
        ToolStatus {
            name: "yt-dlp",
            path: media.yt_dlp_path.clone(),
            purpose: "required for YouTube metadata and audio",
            version: yt_dlp,
        },
        ToolStatus {
            name: "ffmpeg",
            path: media.ffmpeg_path.clone(),
            purpose: "required to re-encode non-audio downloads",
            version: ffmpeg,
        },
    ]
}

/// Run `command version_flag` and return the first line of its stdout
pub async fn tool_version(command: &str, version_flag: &str) -> Option<String> {
    let output = Command::new(command).arg(version_flag).output().await.ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
