//! songtrigger - request songs from a songserver and save them
//!
//! Drives the same trigger a browser page would, with the terminal standing
//! in for the page: UI changes are logged and each published download is
//! written to disk under its `ai-song-<millis>.mid` name.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use songconf::SongConfig;
use songtrigger::{GenerationTrigger, ResourceHandle, TriggerOutcome, TriggerSurface};
use tracing::info;

#[derive(Parser)]
#[command(name = "songtrigger")]
#[command(about = "Request AI-generated songs from a songserver")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./aisong.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trigger generation and save each song
    Generate {
        /// Number of songs to request, one after another
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Directory for downloaded songs (defaults to client.download_dir)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Server base URL (overrides client.base_url)
        #[arg(long)]
        url: Option<String>,
    },
}

/// Logs every UI change and remembers where the download link points.
#[derive(Default)]
struct TerminalSurface {
    download: Mutex<Option<(ResourceHandle, String)>>,
}

impl TerminalSurface {
    fn take_download(&self) -> Option<(ResourceHandle, String)> {
        self.download.lock().ok().and_then(|mut d| d.take())
    }
}

impl TriggerSurface for TerminalSurface {
    fn set_trigger_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "trigger");
    }

    fn set_trigger_label(&self, label: &str) {
        tracing::debug!(label, "trigger label");
    }

    fn set_status(&self, text: &str) {
        info!("{}", text);
    }

    fn set_player_source(&self, handle: &ResourceHandle) {
        tracing::debug!(%handle, "player source");
    }

    fn set_download(&self, handle: &ResourceHandle, file_name: &str) {
        tracing::debug!(%handle, file_name, "download link");
        if let Ok(mut download) = self.download.lock() {
            *download = Some((handle.clone(), file_name.to_string()));
        }
    }

    fn set_download_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "download link enabled");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config =
        SongConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!(
                    "{},songtrigger=debug",
                    config.infra.telemetry.log_level
                ))
            }),
        )
        .init();

    match cli.command {
        Commands::Generate {
            count,
            out_dir,
            url,
        } => {
            if let Some(url) = url {
                config.client.base_url = url;
            }
            let out_dir = out_dir.unwrap_or_else(|| config.client.download_dir.clone());
            tokio::fs::create_dir_all(&out_dir)
                .await
                .with_context(|| format!("Failed to create {}", out_dir.display()))?;

            let surface = Arc::new(TerminalSurface::default());
            let trigger = GenerationTrigger::from_config(&config.client, surface.clone());
            info!(url = %config.client.endpoint_url(), count, "requesting songs");

            let mut failures = 0;
            for _ in 0..count {
                match trigger.activate().await {
                    TriggerOutcome::Ready(handle) => {
                        let (published, file_name) = surface
                            .take_download()
                            .context("Download link was not set")?;
                        let bytes = trigger
                            .resolve(&published)
                            .with_context(|| format!("Handle {} already released", handle))?;
                        let path = out_dir.join(&file_name);
                        tokio::fs::write(&path, &bytes)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        println!("{}", path.display());
                    }
                    TriggerOutcome::Failed(err) => {
                        tracing::error!(error = %err, "generation failed");
                        failures += 1;
                    }
                    TriggerOutcome::Ignored => {}
                }
            }

            if failures > 0 {
                bail!("{} of {} generations failed", failures, count);
            }
        }
    }

    Ok(())
}
