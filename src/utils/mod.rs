use anyhow::{Context, Result};
use std::path::Path;

use crate::config::ToolsConfig;

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

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                // Keep alphanumeric characters, spaces, hyphens, underscores, and dots
                c if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' || c == '.' => c,
                // Replace everything else with underscore
                _ => '_',
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Move a file, falling back to copy + delete across filesystems
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    if fs_err::rename(from, to).is_ok() {
        return Ok(());
    }

    fs_err::copy(from, to).context("Failed to copy final file")?;
    fs_err::remove_file(from).context("Failed to remove original after copy")?;
    Ok(())
}

/// Check if the current environment has required tools
pub async fn check_dependencies(tools: &ToolsConfig) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&tools.yt_dlp_path, "--version").await {
        missing.push(format!("{} - required to list and download streams", tools.yt_dlp_path));
    }

    if !check_command_available(&tools.ffmpeg_path, "-version").await {
        missing.push(format!("{} - required to mux and encode", tools.ffmpeg_path));
    }

    if !check_command_available(&tools.ffprobe_path, "-version").await {
        missing.push(format!("{} - required to read downloaded streams", tools.ffprobe_path));
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str, version_flag: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg(version_flag)
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1.0 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30.0), "30s");
        assert_eq!(format_duration(90.0), "1m 30s");
        assert_eq!(format_duration(3661.0), "1h 1m 1s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("720p"), "720p");
        assert_eq!(sanitize_filename("test/file?name"), "test_file_name");
        assert_eq!(sanitize_filename("  spaced  "), "spaced");
    }

    #[test]
    fn test_move_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("video_final.mp4");
        fs_err::write(&from, b"muxed").unwrap();
        let to = dir.path().join("out").join("clip.mp4");

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs_err::read(&to).unwrap(), b"muxed");
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let tools = ToolsConfig {
            yt_dlp_path: "definitely-not-a-real-binary-xyz".to_string(),
            ..ToolsConfig::default()
        };
        let missing = check_dependencies(&tools).await;
        assert!(missing.iter().any(|m| m.starts_with("definitely-not-a-real-binary-xyz")));
    }
}
