//! Cache configuration.

use crate::error::{CacheError, CacheResult};

/// Which store implementation backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    /// In-process maps; contents are lost on restart
    Memory,
}

impl std::str::FromStr for CacheBackend {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(CacheError::config_error(format!(
                "unknown cache backend '{}'",
                other
            ))),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Store for media summaries and subject history
    pub history_url: String,
    /// Store for content-source sessions
    pub sessions_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            history_url: "redis://localhost:6379/0".to_string(),
            sessions_url: "redis://localhost:6379/1".to_string(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    pub fn from_env() -> CacheResult<Self> {
        let defaults = Self::default();
        let backend = match std::env::var("CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            backend,
            history_url: std::env::var("REDIS_HISTORY_URL").unwrap_or(defaults.history_url),
            sessions_url: std::env::var("REDIS_SESSIONS_URL").unwrap_or(defaults.sessions_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var("CACHE_BACKEND");
        std::env::remove_var("REDIS_HISTORY_URL");
        std::env::remove_var("REDIS_SESSIONS_URL");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.backend, CacheBackend::Redis);
        assert_eq!(config.history_url, "redis://localhost:6379/0");
    }

    #[test]
    #[serial]
    fn test_from_env_memory_backend() {
        std::env::set_var("CACHE_BACKEND", "Memory");
        std::env::set_var("REDIS_SESSIONS_URL", "redis://sessions:6379");

        let config = CacheConfig::from_env().unwrap();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.sessions_url, "redis://sessions:6379");

        std::env::remove_var("CACHE_BACKEND");
        std::env::remove_var("REDIS_SESSIONS_URL");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_unknown_backend() {
        std::env::set_var("CACHE_BACKEND", "memcached");
        assert!(CacheConfig::from_env().is_err());
        std::env::remove_var("CACHE_BACKEND");
    }
}
