//! Configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "STREAMLOOP_CONFIG";

/// Resolve which configuration file to load, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `STREAMLOOP_CONFIG` environment variable
/// 3. `<platform config dir>/streamloop/config.toml`, if it exists
///
/// Returns `None` when nothing applies; callers fall back to built-in defaults.
pub fn resolve_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir()?.join("streamloop").join("config.toml");
    if user_config.exists() {
        Some(user_config)
    } else {
        debug!("No config file at {}", user_config.display());
        None
    }
}

/// Read and parse a TOML configuration file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        level: String,
        #[serde(default)]
        count: u32,
    }

    #[test]
    #[serial]
    fn test_cli_argument_wins() {
        std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
        let resolved = resolve_config_file(Some(Path::new("/from/cli.toml")));
        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));
    }

    #[test]
    #[serial]
    fn test_env_var_used_without_cli() {
        std::env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
        let resolved = resolve_config_file(None);
        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let parsed: Sample = load_toml(file.path()).unwrap();
        assert_eq!(parsed.level, "debug");
        assert_eq!(parsed.count, 0);
    }

    #[test]
    fn test_load_toml_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "level = ").unwrap();

        let result: Result<Sample> = load_toml(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_toml_missing_file() {
        let result: Result<Sample> = load_toml(Path::new("/nonexistent/streamloop.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
