//! Trigger client configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server the endpoint path is resolved against.
    /// Default: http://127.0.0.1:5000
    #[serde(default = "ClientConfig::default_base_url")]
    pub base_url: String,

    /// Server-relative generation endpoint.
    /// Default: /generate-midi
    #[serde(default = "ClientConfig::default_endpoint")]
    pub endpoint: String,

    /// Where the terminal frontend saves downloads.
    /// Default: .
    #[serde(default = "ClientConfig::default_download_dir")]
    pub download_dir: PathBuf,

    /// Resource handles kept alive at once. Older ones are released first.
    /// Default: 1
    #[serde(default = "ClientConfig::default_max_live_handles")]
    pub max_live_handles: usize,
}

impl ClientConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:5000".to_string()
    }

    fn default_endpoint() -> String {
        "/generate-midi".to_string()
    }

    fn default_download_dir() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_max_live_handles() -> usize {
        1
    }

    /// Absolute URL of the generation endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_live_handles == 0 {
            return Err(ConfigError::Invalid {
                field: "client.max_live_handles",
                message: "must be at least 1".into(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "client.base_url",
                message: format!("{} is not an http(s) URL", self.base_url),
            });
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            endpoint: Self::default_endpoint(),
            download_dir: Self::default_download_dir(),
            max_live_handles: Self::default_max_live_handles(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_normalizes_slashes() {
        let config = ClientConfig {
            base_url: "http://localhost:5000/".into(),
            endpoint: "/generate-midi".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint_url(), "http://localhost:5000/generate-midi");

        let config = ClientConfig {
            base_url: "http://localhost:5000".into(),
            endpoint: "generate-midi".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint_url(), "http://localhost:5000/generate-midi");
    }

    #[test]
    fn zero_live_handles_is_rejected() {
        let config = ClientConfig {
            max_live_handles: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
