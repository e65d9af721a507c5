//! Pipeline configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the override in the data dir
//!    (~/.local/share/finsight/config/finsight.toml)
//! 2. Embedded defaults (compiled into binary)
//!
//! Missing keys in an override file fall back to the defaults. Detection
//! thresholds are fixed constants in their engines and are not configurable.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::forecast::{DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS};
use crate::insights::DEFAULT_MAX_INSIGHTS;

/// Embedded default config (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/finsight.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub forecast_days: u32,
    pub max_insights: usize,
    pub server: ServerSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forecast_days: DEFAULT_FORECAST_DAYS,
            max_insights: DEFAULT_MAX_INSIGHTS,
            server: ServerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Extra CORS origins; empty means same-origin only
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Embedded => write!(f, "built-in defaults"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("finsight").join("config").join("finsight.toml"))
}

impl PipelineConfig {
    /// Load configuration (explicit path, then data dir override, then embedded)
    ///
    /// An explicit path must exist; the data dir override is optional.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.exists()),
        };

        match path {
            Some(path) => {
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let config = Self::parse(&content)?;
                debug!(path = %path.display(), "Loaded config override");
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::parse(DEFAULT_CONFIG)?, ConfigSource::Embedded)),
        }
    }

    /// Parse and validate TOML config content
    pub fn parse(content: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast_days == 0 || self.forecast_days > MAX_FORECAST_DAYS {
            return Err(Error::Config(format!(
                "forecast_days must be between 1 and {}, got {}",
                MAX_FORECAST_DAYS, self.forecast_days
            )));
        }
        if self.max_insights == 0 {
            return Err(Error::Config("max_insights must be at least 1".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(Error::Config("server.max_body_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Render as TOML (for `finsight config`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = PipelineConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = PipelineConfig::parse("max_insights = 5\n[server]\nport = 8080\n").unwrap();
        assert_eq!(config.max_insights, 5);
        assert_eq!(config.forecast_days, 30);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            PipelineConfig::parse("forecast_days = 0"),
            Err(Error::Config(_))
        ));
        assert!(PipelineConfig::parse("max_insights = 0").is_err());
        assert!(matches!(
            PipelineConfig::parse("forecast_days = \"soon\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "forecast_days = 14").unwrap();

        let (config, source) = PipelineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.forecast_days, 14);
        assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = PipelineConfig::load(Some(Path::new("/nonexistent/finsight.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_to_toml_roundtrips() {
        let config = PipelineConfig::default();
        let rendered = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::parse(&rendered).unwrap(), config);
    }
}
