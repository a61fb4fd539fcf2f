use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_recursor_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_recursor_max_retries() -> u32 {
    2
}

fn default_health_port() -> u16 {
    2345
}

fn default_health_check_interval() -> Duration {
    Duration::from_secs(20)
}

fn default_health_max_failures() -> u32 {
    3
}

fn default_health_startup_grace() -> Duration {
    Duration::from_secs(30)
}

/// How a [`crate::recursor::RecursorPool`] picks among its configured
/// upstreams, per spec.md §4.4.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecursorSelection {
    #[default]
    Serial,
    Smart,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_max_ttl", with = "duration_secs")]
    pub max_ttl: Duration,
    #[serde(default = "default_cache_min_ttl", with = "duration_secs")]
    pub min_ttl: Duration,
}

fn default_cache_max_ttl() -> Duration {
    Duration::from_secs(3600)
}

fn default_cache_min_ttl() -> Duration {
    Duration::from_secs(1)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_ttl: default_cache_max_ttl(),
            min_ttl: default_cache_min_ttl(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_health_port")]
    pub port: u16,
    pub ca: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    #[serde(default = "default_health_check_interval", with = "duration_secs")]
    pub check_interval: Duration,
    #[serde(default = "default_health_max_failures")]
    pub max_failures: u32,
    /// How long after server start an `unchecked` IP is treated as healthy,
    /// to avoid empty answers while the first health sweep is still
    /// warming up (spec.md §9).
    #[serde(default = "default_health_startup_grace", with = "duration_secs")]
    pub startup_grace: Duration,
}

/// Where a zone's authoritative answers come from: either the built-in
/// [`crate::records::RecordStore`] discovery resolver, or a pass-through
/// recursor that forwards to specific upstreams regardless of the global
/// pool (spec.md §6's `handlers` list).
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HandlerSource {
    Discovery,
    Recursor { recursors: Vec<SocketAddr> },
    HttpJson { url: String },
}

#[derive(Clone, Debug, Deserialize)]
pub struct HandlerConfig {
    pub zone: String,
    pub source: HandlerSource,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: std::net::IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub recursors: Vec<SocketAddr>,
    #[serde(default)]
    pub recursor_selection: RecursorSelection,
    #[serde(default = "default_recursor_timeout", with = "duration_secs")]
    pub recursor_timeout: Duration,
    #[serde(default = "default_recursor_max_retries")]
    pub recursor_max_retries: u32,
    #[serde(default)]
    pub excluded_recursors: Vec<SocketAddr>,

    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub health: Option<HealthConfig>,

    #[serde(default)]
    pub alias_files: Vec<PathBuf>,
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,
}

fn default_port() -> u16 {
    crate::constants::PORT
}

impl ServerConfig {
    /// Loads and validates configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(format!("reading {}: {e}", path.display())))?;
        let config: ServerConfig = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recursors.is_empty() && self.handlers.is_empty() {
            return Err(ConfigError::ParseError(
                "at least one recursor or handler must be configured".into(),
            ));
        }
        if self.recursor_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "recursor_timeout must be greater than 0".into(),
            ));
        }
        if let Some(health) = &self.health {
            if health.enabled && health.port == 0 {
                return Err(ConfigError::ParseError(
                    "health.port must be nonzero when health checking is enabled".into(),
                ));
            }
        }
        for recursor in &self.excluded_recursors {
            if !self.recursors.contains(recursor) {
                return Err(ConfigError::InvalidUpstreamServer(format!(
                    "excluded_recursors entry {recursor} is not in recursors"
                )));
            }
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_config_with_no_upstream_and_no_handlers() {
        let config = ServerConfig {
            address: "0.0.0.0".parse().unwrap(),
            port: 1053,
            recursors: vec![],
            recursor_selection: RecursorSelection::Serial,
            recursor_timeout: Duration::from_secs(2),
            recursor_max_retries: 2,
            excluded_recursors: vec![],
            cache: CacheConfig::default(),
            health: None,
            alias_files: vec![],
            handlers: vec![],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_excluded_recursor_not_in_the_pool() {
        let config = ServerConfig {
            address: "0.0.0.0".parse().unwrap(),
            port: 1053,
            recursors: vec!["1.1.1.1:53".parse().unwrap()],
            recursor_selection: RecursorSelection::Serial,
            recursor_timeout: Duration::from_secs(2),
            recursor_max_retries: 2,
            excluded_recursors: vec!["8.8.8.8:53".parse().unwrap()],
            cache: CacheConfig::default(),
            health: None,
            alias_files: vec![],
            handlers: vec![],
        };
        assert!(config.validate().is_err());
    }
}
