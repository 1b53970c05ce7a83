//! Crate configuration.
//!
//! Everything here has a working default; hosts that need to point at a
//! different API or tune the cache do it through the builder or the
//! `CLASSGATE_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_TTL;
use crate::client::{FeatureServiceConfig, HttpFeatureService};

/// Configuration for the feature-access core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Base URL of the platform API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout for feature service requests.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// How long fetched bundles stay cached.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: Duration,
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout: default_request_timeout(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

impl AccessConfig {
    /// Start building a configuration from defaults.
    #[must_use]
    pub fn builder() -> AccessConfigBuilder {
        AccessConfigBuilder::new()
    }

    /// The feature service client this configuration describes.
    #[must_use]
    pub fn feature_service(&self) -> HttpFeatureService {
        HttpFeatureService::with_config(
            FeatureServiceConfig::default()
                .base_url(self.api_base_url.clone())
                .timeout(self.request_timeout),
        )
    }
}

/// Builder for [`AccessConfig`].
#[derive(Debug, Clone, Default)]
pub struct AccessConfigBuilder {
    config: AccessConfig,
}

impl AccessConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    /// Set the feature service request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the bundle cache TTL.
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    /// Override settings from environment variables.
    ///
    /// - `CLASSGATE_API_URL`
    /// - `CLASSGATE_REQUEST_TIMEOUT_SECS`
    /// - `CLASSGATE_CACHE_TTL_SECS`
    ///
    /// Unset or unparsable variables leave the current value untouched.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if let Ok(url) = std::env::var("CLASSGATE_API_URL") {
            self.config.api_base_url = url;
        }
        if let Some(secs) = env_u64("CLASSGATE_REQUEST_TIMEOUT_SECS") {
            self.config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("CLASSGATE_CACHE_TTL_SECS") {
            self.config.cache_ttl = Duration::from_secs(secs);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> AccessConfig {
        self.config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_builder_overrides() {
        let config = AccessConfig::builder()
            .api_base_url("https://api.classgate.io/api")
            .request_timeout(Duration::from_secs(3))
            .cache_ttl(Duration::from_secs(60))
            .build();

        assert_eq!(config.api_base_url, "https://api.classgate.io/api");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_feature_service_uses_config() {
        let config = AccessConfig::builder()
            .api_base_url("https://api.classgate.io/api")
            .build();
        let service = config.feature_service();
        assert_eq!(service.config().base_url, "https://api.classgate.io/api");
    }
}
