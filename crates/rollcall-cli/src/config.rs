use std::path::{Path, PathBuf};

use anyhow::Context;
use rollcall_core::DEFAULT_TOLERANCE;
use serde::Deserialize;

/// CLI configuration, loaded from a TOML file with `ROLLCALL_*` environment
/// overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Euclidean-distance tolerance for a positive identity match.
    pub tolerance: f32,
    /// External embedding extractor: program followed by its arguments.
    /// Receives image bytes on stdin, prints a JSON array of float arrays.
    pub extractor: Vec<String>,
    /// Reject registration when the enrollment photo yields no face.
    /// Default: accept and store the student without an identity vector.
    pub require_face: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_data_dir().join("students.db"),
            tolerance: DEFAULT_TOLERANCE,
            extractor: vec!["rollcall-embed".to_string()],
            require_face: false,
        }
    }
}

impl Config {
    /// Load configuration. An explicitly given path must exist; otherwise
    /// the default location is used when present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading config file {}", path.display()))?;
                    toml::from_str(&text)
                        .with_context(|| format!("parsing config file {}", path.display()))?
                }
                None => Config::default(),
            }
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ROLLCALL_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        self.tolerance = env_f32("ROLLCALL_TOLERANCE", self.tolerance);
        if let Ok(v) = std::env::var("ROLLCALL_REQUIRE_FACE") {
            self.require_face = v != "0";
        }
    }
}

/// Default config file: $XDG_CONFIG_HOME/rollcall/config.toml.
fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;
    Some(base.join("rollcall").join("config.toml"))
}

/// Default data directory: $XDG_DATA_HOME/rollcall.
fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert!(!config.require_face);
        assert!(config.db_path.ends_with("rollcall/students.db"));
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/var/lib/rollcall/students.db"
            tolerance = 0.45
            extractor = ["python3", "/opt/extract.py"]
            require_face = true
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/rollcall/students.db"));
        assert_eq!(config.tolerance, 0.45);
        assert_eq!(config.extractor, vec!["python3", "/opt/extract.py"]);
        assert!(config.require_face);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("tolerance = 0.3").unwrap();
        assert_eq!(config.tolerance, 0.3);
        assert_eq!(config.extractor, vec!["rollcall-embed"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("treshold = 0.3").is_err());
    }
}
