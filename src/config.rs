//! Engine configuration
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! [engine]
//! prefix = "tpl-"
//! refresh_ms = 50
//! base_path = "templates"
//! fetch_timeout_ms = 30000
//! require_prefix = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Prefix stripped from plugin attribute and tag names
pub const DEFAULT_PREFIX: &str = "tpl-";

/// Delay between the first change and the refresh it triggers
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(50);

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings for compiling and refreshing templates
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub prefix: String,
    pub refresh_period: Duration,
    /// Directory relative `src` paths are resolved against
    pub base_path: Option<PathBuf>,
    /// Only used by the HTTP fetcher
    pub fetch_timeout: Duration,
    /// Match only prefixed plugin names (`tpl-for`, not `for`)
    pub require_prefix: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            refresh_period: DEFAULT_REFRESH_PERIOD,
            base_path: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            require_prefix: false,
        }
    }
}

#[derive(Deserialize)]
struct TomlConfig {
    engine: Option<TomlEngine>,
}

#[derive(Deserialize)]
struct TomlEngine {
    prefix: Option<String>,
    refresh_ms: Option<u64>,
    base_path: Option<PathBuf>,
    fetch_timeout_ms: Option<u64>,
    require_prefix: Option<bool>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_require_prefix(mut self, require: bool) -> Self {
        self.require_prefix = require;
        self
    }

    /// Load configuration from a TOML file; a relative `base_path` is taken
    /// relative to the file's directory
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let (Some(base), Some(dir)) = (&config.base_path, path.parent()) {
            if base.is_relative() {
                config.base_path = Some(dir.join(base));
            }
        }
        Ok(config)
    }

    /// Load configuration from a TOML string; missing keys keep their
    /// defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(engine) = parsed.engine {
            if let Some(prefix) = engine.prefix {
                config.prefix = prefix;
            }
            if let Some(ms) = engine.refresh_ms {
                config.refresh_period = Duration::from_millis(ms);
            }
            if let Some(ms) = engine.fetch_timeout_ms {
                config.fetch_timeout = Duration::from_millis(ms);
            }
            if let Some(require) = engine.require_prefix {
                config.require_prefix = require;
            }
            config.base_path = engine.base_path;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.prefix, "tpl-");
        assert_eq!(config.refresh_period, Duration::from_millis(50));
        assert_eq!(config.base_path, None);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_prefix("x-")
            .with_refresh_period(Duration::from_millis(5))
            .with_base_path("tpl");
        assert_eq!(config.prefix, "x-");
        assert_eq!(config.refresh_period, Duration::from_millis(5));
        assert_eq!(config.base_path, Some(PathBuf::from("tpl")));
    }

    #[test]
    fn test_from_str_partial() {
        let config = EngineConfig::from_str("[engine]\nrefresh_ms = 10\n").expect("Should parse");
        assert_eq!(config.refresh_period, Duration::from_millis(10));
        assert_eq!(config.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_from_str_full() {
        let config = EngineConfig::from_str(
            r#"
[engine]
prefix = "data-"
refresh_ms = 100
base_path = "/srv/tpl"
fetch_timeout_ms = 500
require_prefix = true
"#,
        )
        .expect("Should parse");
        assert_eq!(
            config,
            EngineConfig::new()
                .with_prefix("data-")
                .with_refresh_period(Duration::from_millis(100))
                .with_base_path("/srv/tpl")
                .with_fetch_timeout(Duration::from_millis(500))
                .with_require_prefix(true)
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(EngineConfig::from_str("").expect("empty"), EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_str("[engine]\nrefresh_ms = \"soon\"").expect_err("bad type");
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
