use crate::batch::MAX_FILES_PER_BATCH;
use crate::upload::DEFAULT_FLAT_FILE_CAP;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    #[error("Flat file cap must be at least 1")]
    ZeroFlatFileCap,

    #[error("Invalid API URL {url}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Client configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// base URL of the transfer backend
    pub api_url: String,
    /// files per directory-upload batch
    pub batch_size: usize,
    /// most files a flat upload may carry
    pub flat_file_cap: usize,
    /// request timeout; none means the HTTP client's default
    pub timeout: Option<Duration>,
    /// where downloaded archives are written
    pub download_dir: PathBuf,
    /// default log level when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            batch_size: MAX_FILES_PER_BATCH,
            flat_file_cap: DEFAULT_FLAT_FILE_CAP,
            timeout: None,
            download_dir: PathBuf::from("."),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            api_url: lookup("TREEDROP_API_URL").unwrap_or(defaults.api_url),
            batch_size: lookup("TREEDROP_BATCH_SIZE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.batch_size),
            flat_file_cap: lookup("TREEDROP_FLAT_FILE_CAP")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.flat_file_cap),
            timeout: lookup("TREEDROP_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs),
            download_dir: lookup("TREEDROP_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            log_level: lookup("TREEDROP_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.flat_file_cap == 0 {
            return Err(ConfigError::ZeroFlatFileCap);
        }

        let parsed = Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.batch_size, 1500);
        assert_eq!(config.timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("TREEDROP_API_URL", "https://drop.example.com"),
            ("TREEDROP_BATCH_SIZE", "200"),
            ("TREEDROP_TIMEOUT_SECS", "30"),
            ("TREEDROP_DOWNLOAD_DIR", "/tmp/out"),
        ]));
        assert_eq!(config.api_url, "https://drop.example.com");
        assert_eq!(config.batch_size, 200);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = ClientConfig::from_lookup(lookup(&[("TREEDROP_BATCH_SIZE", "lots")]));
        assert_eq!(config.batch_size, MAX_FILES_PER_BATCH);
    }

    #[test]
    fn test_validate() {
        let zero = ClientConfig::from_lookup(lookup(&[("TREEDROP_BATCH_SIZE", "0")]));
        assert_eq!(zero.validate(), Err(ConfigError::ZeroBatchSize));

        let bad_url = ClientConfig {
            api_url: "localhost:3000".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            bad_url.validate(),
            Err(ConfigError::InvalidApiUrl { .. })
        ));
    }
}
