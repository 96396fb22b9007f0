//! Layered configuration loading for aisong.
//!
//! Every aisong process (the HTTP server, the one-shot generator and the
//! trigger client) reads the same file so they agree on ports, endpoint paths
//! and generation parameters.
//!
//! # Sections
//!
//! - **Infrastructure** (`InfraConfig`): bind address and telemetry. Fixed for
//!   the lifetime of a process.
//! - **Generation** (`GenerationConfig`): corpus location and sampling knobs
//!   used by the server when it composes a song.
//! - **Client** (`ClientConfig`): where the trigger client sends its request
//!   and what it does with the result.
//!
//! # Usage
//!
//! ```rust,no_run
//! use songconf::SongConfig;
//!
//! let config = SongConfig::load().expect("Failed to load config");
//! println!("listening on {}", config.infra.bind.socket_addr());
//! println!("generating {} notes", config.generation.num_notes);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/aisong/config.toml` (system)
//! 2. `~/.config/aisong/config.toml` (user)
//! 3. `./aisong.toml` (local override, replaced by `--config` when given)
//! 4. Environment variables (`PORT`, `AISONG_*`, `RUST_LOG`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! host = "0.0.0.0"
//! http_port = 5000
//!
//! [telemetry]
//! log_level = "info"
//! otlp_endpoint = ""
//!
//! [generation]
//! corpus_file = "output/processed_midi.json"
//! num_notes = 64
//! top_p = 0.9
//!
//! [client]
//! base_url = "http://127.0.0.1:5000"
//! endpoint = "/generate-midi"
//! ```

pub mod client;
pub mod generation;
pub mod infra;
pub mod loader;

pub use client::ClientConfig;
pub use generation::GenerationConfig;
pub use infra::{BindConfig, InfraConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Complete aisong configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SongConfig {
    /// Infrastructure - cannot change at runtime.
    #[serde(flatten)]
    pub infra: InfraConfig,

    /// Song generation parameters.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Trigger client settings.
    #[serde(default)]
    pub client: ClientConfig,
}

impl SongConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/aisong/config.toml`
    /// 3. `~/.config/aisong/config.toml`
    /// 4. `./aisong.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an explicit file replacing `./aisong.toml`.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::read_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, sources.files.last())?;
        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values the generator or client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generation.validate()?;
        self.client.validate()?;
        Ok(())
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::from("# aisong configuration\n\n");
        match toml::to_string_pretty(self) {
            Ok(body) => output.push_str(&body),
            Err(e) => output.push_str(&format!("# failed to render config: {}\n", e)),
        }
        output
    }
}
