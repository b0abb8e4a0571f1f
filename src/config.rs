// ⚙️ Configuration
//
// JSON file named by HIVEMIND_CONFIG (optional). HIVEMIND_DB overrides the
// database path either way.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "HIVEMIND_CONFIG";
pub const DB_ENV: &str = "HIVEMIND_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding entities and their transition events
    pub database_path: PathBuf,

    /// Recorded as the actor of transitions requested from this process
    pub actor: String,

    /// Entity kind -> CSV of parameter overrides (Name,Value,Unit)
    pub parameter_files: HashMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("hivemind.db"),
            actor: "hivemind".to_string(),
            parameter_files: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Config file from HIVEMIND_CONFIG (or defaults), then HIVEMIND_DB
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Config::load(Path::new(&path))?,
            None => Config::default(),
        };

        if let Some(db) = std::env::var_os(DB_ENV) {
            config.database_path = PathBuf::from(db);
        }

        Ok(config)
    }

    pub fn parameter_file(&self, kind: &str) -> Option<&Path> {
        self.parameter_files.get(kind).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database_path, PathBuf::from("hivemind.db"));
        assert!(config.parameter_file("site").is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = std::env::temp_dir().join(format!("hivemind-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"actor": "ops", "parameter_files": {"mooring_system": "mooring.csv"}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.actor, "ops");
        assert_eq!(config.database_path, PathBuf::from("hivemind.db"));
        assert_eq!(config.parameter_file("mooring_system"), Some(Path::new("mooring.csv")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/hivemind.json")).is_err());
    }
}
