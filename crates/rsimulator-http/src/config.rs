//! Configuration for the HTTP simulator.
//!
//! Loaded from YAML and overridable from the command line:
//!
//! ```yaml
//! root_path: ./templates
//! listen:
//!   host: 0.0.0.0
//!   port: 8080
//! cache:
//!   enabled: true
//!   max_entries: 1000
//! scripting:
//!   enabled: true
//! diagnostics:
//!   enabled: false
//! log_level: info
//! log_format: text
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Template directory. Required, either here or on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<PathBuf>,
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scripting: ScriptingConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_path: None,
            listen: ListenConfig::default(),
            cache: CacheConfig::default(),
            scripting: ScriptingConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScriptingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Debug responses listing every candidate, requested per call with the
/// `x-rsimulator-debug: true` header.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiagnosticsConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_entries() -> usize {
    rsimulator_core::DEFAULT_MAX_ENTRIES
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse without validating, for callers that apply overrides
    /// first.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let Some(root) = &self.root_path else {
            anyhow::bail!(
                "No template directory configured. Set 'root_path' in the config file or pass --root"
            );
        };
        if !root.is_dir() {
            anyhow::bail!("Template directory '{}' does not exist", root.display());
        }

        if self.cache.enabled && self.cache.max_entries == 0 {
            anyhow::bail!("'cache.max_entries' must be greater than 0 when the cache is enabled");
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Template directory. Only valid after [`Config::validate`] succeeded.
    pub fn root(&self) -> Result<&Path, anyhow::Error> {
        self.root_path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No template directory configured"))
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        format!("{}:{}", self.listen.host, self.listen.port)
            .parse()
            .with_context(|| {
                format!(
                    "Invalid listen address {}:{}",
                    self.listen.host, self.listen.port
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("root_path: /tmp").unwrap();
        assert_eq!(config.root_path, Some(PathBuf::from("/tmp")));
        assert_eq!(config.listen.host, "0.0.0.0");
        assert_eq!(config.listen.port, 8080);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 1000);
        assert!(config.scripting.enabled);
        assert!(!config.diagnostics.enabled);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
root_path: ./templates
listen:
  host: 127.0.0.1
  port: 9090
cache:
  enabled: true
  max_entries: 50
scripting:
  enabled: false
diagnostics:
  enabled: true
log_level: debug
log_format: json
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:9090");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 50);
        assert!(!config.scripting.enabled);
        assert!(config.diagnostics.enabled);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_requires_root() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("root_path"));
    }

    #[test]
    fn test_validate_rejects_missing_directory() {
        let config = Config {
            root_path: Some(PathBuf::from("/definitely/not/here")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_cache() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            root_path: Some(dir.path().to_path_buf()),
            cache: CacheConfig {
                enabled: true,
                max_entries: 0,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            root_path: Some(dir.path().to_path_buf()),
            listen: ListenConfig {
                host: "not a host".to_string(),
                port: 80,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rsimulator.yaml");
        std::fs::write(
            &path,
            format!("root_path: {}\nlisten:\n  port: 7070\n", dir.path().display()),
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.listen.port, 7070);
        assert_eq!(config.root().unwrap(), dir.path());
    }
}
