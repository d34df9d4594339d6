use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::pipeline::TimeInput;

#[derive(Parser)]
#[command(
    name = "streammux",
    about = "StreamMux - Download separate video and audio streams and mux them into one file",
    version,
    long_about = "Downloads the video-only and audio-only streams of a video concurrently, optionally trims the result to a time range, and encodes a single output file. Intermediate downloads are always removed."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a video at a resolution and mux it with the best audio track
    Download {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Resolution tag such as 720p (highest available if not specified)
        #[arg(short, long, value_name = "RES")]
        resolution: Option<String>,

        /// Trim start as M:SS or seconds
        #[arg(long, value_name = "TIME", requires = "end")]
        start: Option<TimeInput>,

        /// Trim end as M:SS or seconds
        #[arg(long, value_name = "TIME", requires = "start")]
        end: Option<TimeInput>,

        /// Move the final file here (stays in the working directory if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output frame rate (overrides config)
        #[arg(long, value_name = "FPS")]
        fps: Option<u32>,

        /// Encoder preset (overrides config)
        #[arg(long, value_name = "PRESET")]
        preset: Option<String>,

        /// Working directory for downloads (overrides config)
        #[arg(long, value_name = "DIR", env = "STREAMMUX_TEMP_DIR")]
        temp_dir: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the resolutions a video offers
    Resolutions {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show or locate the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_with_trim() {
        let cli = Cli::try_parse_from([
            "streammux", "download", "https://youtu.be/abc", "-r", "720p", "--start", "0:30", "--end", "1:00",
        ])
        .unwrap();

        match cli.command {
            Commands::Download { resolution, start, end, .. } => {
                assert_eq!(resolution.as_deref(), Some("720p"));
                assert_eq!(start, Some(TimeInput::new(0, 30)));
                assert_eq!(end, Some(TimeInput::new(1, 0)));
            }
            _ => panic!("expected download command"),
        }
    }

    #[test]
    fn test_start_requires_end() {
        let result = Cli::try_parse_from(["streammux", "download", "https://youtu.be/abc", "--start", "0:30"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_malformed_time() {
        let result = Cli::try_parse_from([
            "streammux", "download", "https://youtu.be/abc", "--start", "0:75", "--end", "1:00",
        ]);
        assert!(result.is_err());
    }
}
