//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Connect timeout used when the config leaves it unset
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Configuration for rtrace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent streaming endpoint
    pub endpoint: Option<String>,
    /// Seconds to wait for the backend to accept a connection
    pub connect_timeout_secs: Option<u64>,
    /// Whether traces start expanded in interactive mode
    pub show_trace: Option<bool>,
    /// Log filter used when neither --verbose nor RUST_LOG is set
    pub log_filter: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rtrace")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("RTRACE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            endpoint: Some(rtrace_wire::DEFAULT_ENDPOINT.to_string()),
            connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
            show_trace: Some(true),
            log_filter: None,
        };

        default_config.save()?;
        Ok(path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# rtrace configuration file
# Place at ~/.config/rtrace/config.toml (Linux) or set RTRACE_CONFIG_PATH

# Streaming endpoint of the agent backend
endpoint = "http://localhost:8000/api/chat/stream"

# Seconds to wait for the backend to accept a connection
connect_timeout_secs = 10

# Show each turn's thought/action trace; when false, traces start collapsed
# (/toggle N flips a single turn either way)
show_trace = true

# Log filter when --verbose and RUST_LOG are not set (optional)
# log_filter = "rtrace=info"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(
            config.endpoint.as_deref(),
            Some(rtrace_wire::DEFAULT_ENDPOINT)
        );
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.show_trace, Some(true));
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse("show_trace = false\n").unwrap();
        assert!(config.endpoint.is_none());
        assert_eq!(config.show_trace, Some(false));
        assert_eq!(
            config.connect_timeout(),
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(Config::parse("connect_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config {
            endpoint: Some("http://agent:9000/stream".into()),
            connect_timeout_secs: Some(3),
            show_trace: Some(false),
            log_filter: Some("rtrace=trace".into()),
        };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), config);
    }
}
