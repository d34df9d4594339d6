use anyhow::Result;
use console::style;

use crate::cli::OutputFormat;
use crate::pipeline::RunReport;
use crate::source::SourceSummary;
use crate::utils::{format_duration, format_file_size};

/// Render the resolution listing of a source
pub fn format_summary(summary: &SourceSummary, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => {
            let mut lines = Vec::new();
            if let Some(title) = &summary.title {
                lines.push(format!("Title:       {}", title));
            }
            lines.push(format!("Duration:    {}", format_duration(summary.duration_seconds as f64)));
            if summary.resolutions.is_empty() {
                lines.push("Resolutions: none".to_string());
            } else {
                lines.push(format!("Resolutions: {}", summary.resolutions.join(", ")));
            }
            Ok(lines.join("\n"))
        }
    }
}

/// Render the outcome of a successful run
pub fn format_report(report: &RunReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let mut lines = vec![format!(
                "{} Muxed {} at {}",
                style("✓").green(),
                report.source,
                report.resolution
            )];
            if let Some(trim) = &report.trim {
                lines.push(format!("  Trimmed to {}s-{}s", trim.start(), trim.end()));
            }
            lines.push(format!(
                "  Output: {} ({})",
                report.output.display(),
                format_file_size(report.output_size)
            ));
            lines.push(format!("  Took {}", format_duration(report.elapsed_seconds)));
            Ok(lines.join("\n"))
        }
    }
}

pub fn print_summary(summary: &SourceSummary, format: &OutputFormat) -> Result<()> {
    println!("{}", format_summary(summary, format)?);
    Ok(())
}

pub fn print_report(report: &RunReport, format: &OutputFormat) -> Result<()> {
    println!("{}", format_report(report, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> SourceSummary {
        SourceSummary {
            source: "https://youtu.be/abc".to_string(),
            title: Some("Sample".to_string()),
            duration_seconds: 125,
            resolutions: vec!["360p".to_string(), "720p".to_string()],
        }
    }

    #[test]
    fn test_text_summary() {
        let text = format_summary(&summary(), &OutputFormat::Text).unwrap();
        assert!(text.contains("Title:       Sample"));
        assert!(text.contains("2m 5s"));
        assert!(text.contains("360p, 720p"));
    }

    #[test]
    fn test_json_summary() {
        let json = format_summary(&summary(), &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["duration_seconds"], 125);
        assert_eq!(value["resolutions"][1], "720p");
    }
}
