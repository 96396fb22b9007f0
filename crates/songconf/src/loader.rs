//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, SongConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local).
/// Only returns files that exist.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/aisong/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("aisong/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("aisong.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a TOML file into a raw table.
pub fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_table(&contents, path)
}

fn parse_table(contents: &str, path: &Path) -> Result<toml::Table, ConfigError> {
    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Deep-merge `overlay` into `base`. Nested tables merge key by key, anything
/// else in `overlay` replaces the value in `base`.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Turn a merged table into a typed config, filling gaps with defaults.
pub fn from_table(table: toml::Table, origin: Option<&PathBuf>) -> Result<SongConfig, ConfigError> {
    let origin = origin.cloned().unwrap_or_else(|| PathBuf::from("<defaults>"));
    let mut config: SongConfig =
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse {
                path: origin,
                message: e.to_string(),
            })?;

    expand_config_paths(&mut config);
    Ok(config)
}

fn expand_config_paths(config: &mut SongConfig) {
    config.generation.corpus_file = expand_path(&config.generation.corpus_file.to_string_lossy());
    if let Some(out) = config.generation.output_file.take() {
        config.generation.output_file = Some(expand_path(&out.to_string_lossy()));
    }
    config.client.download_dir = expand_path(&config.client.download_dir.to_string_lossy());
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut SongConfig, sources: &mut ConfigSources) {
    apply_overrides_from(config, sources, |key| env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup. `apply_env_overrides` passes the
/// process environment.
pub fn apply_overrides_from<F>(config: &mut SongConfig, sources: &mut ConfigSources, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let hit = |key: &str, sources: &mut ConfigSources| sources.env_overrides.push(key.to_string());

    // Bind address. PORT is what hosting platforms set.
    if let Some(v) = lookup("AISONG_HOST") {
        config.infra.bind.host = v;
        hit("AISONG_HOST", sources);
    }
    for key in ["PORT", "AISONG_HTTP_PORT"] {
        if let Some(port) = lookup(key).and_then(|v| v.parse().ok()) {
            config.infra.bind.http_port = port;
            hit(key, sources);
        }
    }

    // Telemetry
    for key in ["AISONG_OTLP_ENDPOINT", "OTEL_EXPORTER_OTLP_ENDPOINT"] {
        if let Some(v) = lookup(key) {
            config.infra.telemetry.otlp_endpoint = v;
            hit(key, sources);
        }
    }
    for key in ["AISONG_LOG_LEVEL", "RUST_LOG"] {
        if let Some(v) = lookup(key) {
            config.infra.telemetry.log_level = v;
            hit(key, sources);
        }
    }

    // Generation
    if let Some(v) = lookup("AISONG_CORPUS_FILE") {
        config.generation.corpus_file = expand_path(&v);
        hit("AISONG_CORPUS_FILE", sources);
    }
    if let Some(v) = lookup("AISONG_OUTPUT_FILE") {
        config.generation.output_file = if v.is_empty() { None } else { Some(expand_path(&v)) };
        hit("AISONG_OUTPUT_FILE", sources);
    }
    if let Some(n) = lookup("AISONG_NUM_NOTES").and_then(|v| v.parse().ok()) {
        config.generation.num_notes = n;
        hit("AISONG_NUM_NOTES", sources);
    }
    if let Some(p) = lookup("AISONG_TOP_P").and_then(|v| v.parse().ok()) {
        config.generation.top_p = p;
        hit("AISONG_TOP_P", sources);
    }

    // Client
    if let Some(v) = lookup("AISONG_BASE_URL") {
        config.client.base_url = v;
        hit("AISONG_BASE_URL", sources);
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn parse(toml: &str) -> SongConfig {
        let table = parse_table(toml, Path::new("test.toml")).unwrap();
        from_table(table, None).unwrap()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/test/path");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_absolute() {
        assert_eq!(expand_path("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = parse(
            r#"
[bind]
http_port = 9000
"#,
        );
        assert_eq!(config.infra.bind.http_port, 9000);
        assert_eq!(config.infra.bind.host, "0.0.0.0");
        assert_eq!(config.generation.top_p, 0.9);
    }

    #[test]
    fn test_parse_full_toml() {
        let config = parse(
            r#"
[bind]
host = "127.0.0.1"
http_port = 8000

[telemetry]
log_level = "debug"
otlp_endpoint = "localhost:4317"

[generation]
corpus_file = "/data/corpus.json"
output_file = "/data/out.mid"
num_notes = 32
sequence_length = 16
temperature_pitch = 1.2
temperature_dur = 1.0
top_p = 0.8
model_order = 3

[client]
base_url = "http://music.local:8000"
endpoint = "/compose"
max_live_handles = 4
"#,
        );

        assert_eq!(config.infra.bind.socket_addr(), "127.0.0.1:8000");
        assert_eq!(config.infra.telemetry.log_level, "debug");
        assert_eq!(config.infra.telemetry.otlp(), Some("localhost:4317"));
        assert_eq!(config.generation.corpus_file, PathBuf::from("/data/corpus.json"));
        assert_eq!(config.generation.output_file, Some(PathBuf::from("/data/out.mid")));
        assert_eq!(config.generation.num_notes, 32);
        assert_eq!(config.generation.sequence_length, 16);
        assert_eq!(config.generation.model_order, 3);
        assert_eq!(config.client.endpoint_url(), "http://music.local:8000/compose");
        assert_eq!(config.client.max_live_handles, 4);
    }

    #[test]
    fn test_empty_output_file_in_toml_disables_writing() {
        let config = parse("[generation]\noutput_file = \"\"\nnum_notes = 8");
        assert_eq!(config.generation.output_file, None);
        assert_eq!(config.generation.num_notes, 8);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse_table("[bind\nhttp_port = ", Path::new("broken.toml")).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, PathBuf::from("broken.toml")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base = parse_table(
            r#"
[bind]
host = "127.0.0.1"
http_port = 7000
"#,
            Path::new("base.toml"),
        )
        .unwrap();
        let overlay = parse_table(
            r#"
[bind]
http_port = 7001
"#,
            Path::new("overlay.toml"),
        )
        .unwrap();

        merge_tables(&mut base, overlay);
        let config = from_table(base, None).unwrap();
        assert_eq!(config.infra.bind.host, "127.0.0.1");
        assert_eq!(config.infra.bind.http_port, 7001);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PORT", "6100"),
            ("RUST_LOG", "warn"),
            ("AISONG_OUTPUT_FILE", ""),
            ("AISONG_NUM_NOTES", "12"),
            ("AISONG_BASE_URL", "http://other:1"),
            ("AISONG_TOP_P", "not-a-number"),
        ]);
        let mut config = SongConfig::default();
        let mut sources = ConfigSources::default();

        apply_overrides_from(&mut config, &mut sources, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.infra.bind.http_port, 6100);
        assert_eq!(config.infra.telemetry.log_level, "warn");
        assert_eq!(config.generation.output_file, None);
        assert_eq!(config.generation.num_notes, 12);
        assert_eq!(config.client.base_url, "http://other:1");
        assert_eq!(config.generation.top_p, 0.9);
        assert!(sources.env_overrides.contains(&"PORT".to_string()));
        assert!(!sources.env_overrides.contains(&"AISONG_TOP_P".to_string()));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aisong.toml");
        std::fs::write(&path, "[generation]\nnum_notes = 8\n").unwrap();

        let table = read_table(&path).unwrap();
        let config = from_table(table, Some(&path)).unwrap();
        assert_eq!(config.generation.num_notes, 8);
    }
}
