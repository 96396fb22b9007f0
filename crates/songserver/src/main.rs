//! songserver - compose and serve AI-generated MIDI songs
//!
//! Subcommands:
//! - `songserver serve` - Run the HTTP server (default)
//! - `songserver generate` - Compose one song and write it to disk
//! - `songserver config` - Print the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use songconf::{GenerationConfig, SongConfig};
use songgen::{write_song, Generator};
use songserver::{serve, telemetry};

#[derive(Parser)]
#[command(name = "songserver")]
#[command(about = "Compose and serve AI-generated MIDI songs")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./aisong.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// HTTP port to bind (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,
    },

    /// Compose one song and write it to disk
    Generate {
        /// Output path (defaults to generation.output_file)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config =
        SongConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
    });

    match command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.infra.bind.http_port = port;
            }
            if let Some(host) = host {
                config.infra.bind.host = host;
            }

            let guard = telemetry::init(&config.infra.telemetry)
                .context("Failed to initialize telemetry")?;
            let result = serve::run(config).await;
            guard.shutdown();
            result?;
        }
        Commands::Generate { out, seed } => {
            telemetry::init_fmt(&config.infra.telemetry.log_level);

            let path = out
                .or_else(|| config.generation.output_file.clone())
                .unwrap_or_else(|| PathBuf::from(songserver::DOWNLOAD_NAME));
            let generation = config.generation;
            let path = tokio::task::spawn_blocking(move || generate_once(&generation, path, seed))
                .await
                .context("Generation task failed")??;
            println!("{}", path.display());
        }
        Commands::Config => {
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}

/// Train on the corpus, compose one song and write it to `path`.
fn generate_once(generation: &GenerationConfig, path: PathBuf, seed: Option<u64>) -> Result<PathBuf> {
    let generator = Generator::from_config(generation)
        .with_context(|| format!("Failed to load corpus {}", generation.corpus_file.display()))?;
    let song = match seed {
        Some(seed) => generator.generate(&mut StdRng::seed_from_u64(seed))?,
        None => generator.generate(&mut rand::thread_rng())?,
    };
    write_song(&path, &song.midi.bytes)?;
    Ok(path)
}
