use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streammux::cli::{Cli, Commands};
use streammux::config::Config;
use streammux::engine::ffmpeg::FfmpegEngine;
use streammux::pipeline::{Pipeline, ProgressNotice, ProgressSender, VideoRequest};
use streammux::source::{validate_url, youtube::YtDlpProvider, StreamSourceProvider};
use streammux::{output, utils};

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "streammux=debug" } else { "streammux=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Render pipeline notices on a spinner until every sender is gone
fn spawn_progress(quiet: bool) -> (ProgressSender, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let progress = if quiet { ProgressBar::hidden() } else { ProgressBar::new_spinner() };
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        progress.enable_steady_tick(Duration::from_millis(120));

        while let Some(notice) = rx.recv().await {
            match notice {
                ProgressNotice::Probing => progress.set_message("Reading video metadata..."),
                ProgressNotice::Downloading { resolution } => {
                    progress.set_message(format!("Downloading {} video and audio...", resolution))
                }
                ProgressNotice::Downloaded { kind } => progress.println(format!("  {} stream downloaded", kind)),
                ProgressNotice::Encoding { trimmed: true } => progress.set_message("Trimming and encoding..."),
                ProgressNotice::Encoding { trimmed: false } => progress.set_message("Combining video and audio..."),
                ProgressNotice::CleanedUp => progress.set_message("Temporary files removed"),
                ProgressNotice::Finished(_) => progress.set_message("Done"),
            }
        }

        progress.finish_and_clear();
    });

    (tx, handle)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = Config::load().await?;

    // Check for required external tools (non-fatal)
    let missing_deps = utils::check_dependencies(&config.tools).await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    match cli.command {
        Commands::Download {
            url,
            resolution,
            start,
            end,
            output,
            fps,
            preset,
            temp_dir,
            format,
        } => {
            validate_url(&url)?;

            if let Some(fps) = fps {
                config.encoding.fps = fps;
            }
            if let Some(preset) = preset {
                config.encoding.preset = preset;
            }
            if temp_dir.is_some() {
                config.app.temp_dir = temp_dir;
            }
            config.validate()?;

            let provider: Arc<dyn StreamSourceProvider> =
                Arc::new(YtDlpProvider::with_binary(config.tools.yt_dlp_path.clone()));
            let engine = Arc::new(FfmpegEngine::from_tools(&config.tools));

            let resolution = match resolution {
                Some(res) => res,
                None => provider
                    .list_resolutions(&url)
                    .await?
                    .pop()
                    .context("The video offers no downloadable video streams")?,
            };

            let mut request = VideoRequest::new(url.clone(), resolution);
            if let (Some(start), Some(end)) = (start, end) {
                request = request.with_trim(start, end);
            }

            let (progress_tx, progress_task) = spawn_progress(cli.quiet);
            let pipeline = Pipeline::from_config(&config, provider, engine).with_progress(progress_tx);

            tracing::info!("Starting download for URL: {}", url);
            let result = pipeline.run_with_report(&request).await;
            drop(pipeline);
            let _ = progress_task.await;

            let mut report = result?;
            if let Some(path) = output {
                utils::move_file(&report.output, &path)?;
                report.output = path;
            }

            output::print_report(&report, &format)?;
        }
        Commands::Resolutions { url, format } => {
            validate_url(&url)?;
            let provider = YtDlpProvider::with_binary(config.tools.yt_dlp_path.clone());
            let summary = provider.summary(&url).await?;
            output::print_summary(&summary, &format)?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Edit it to change the working directory, encoder settings or tool paths.");
            }
        }
    }

    Ok(())
}
