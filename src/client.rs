//! Remote feature service client.
//!
//! The backend exposes one endpoint for this subsystem:
//! `GET /schools/{schoolId}/features`, returning the school's feature
//! bundle wrapped in an envelope. The query layer talks to it through the
//! [`FeatureService`] trait so tests can swap the network out entirely
//! (see [`crate::testing::MockFeatureService`]).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;

use crate::bundle::FeatureBundle;
use crate::error::{AccessError, Result};

/// Default timeout for feature service requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent sent with feature service requests.
const DEFAULT_USER_AGENT: &str = concat!("classgate/", env!("CARGO_PKG_VERSION"));

/// A source of feature bundles, one per school.
#[async_trait]
pub trait FeatureService: Send + Sync {
    /// Fetch the current bundle for a school.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that does not decode into a consistent bundle. Fallback policy
    /// is the caller's concern, not this trait's.
    async fn fetch_features(&self, school_id: &str) -> Result<FeatureBundle>;
}

/// Configuration for the HTTP feature service client.
#[derive(Clone, Debug)]
pub struct FeatureServiceConfig {
    /// Base URL of the platform API, e.g. `https://api.example.com/api`.
    pub base_url: String,
    /// Timeout for each request (default: 10 seconds).
    pub timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
}

impl Default for FeatureServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FeatureServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Wire envelope around the bundle.
#[derive(Deserialize)]
struct FeaturesEnvelope {
    features: FeatureBundle,
}

/// HTTP implementation of [`FeatureService`] backed by the platform API.
#[derive(Clone, Debug)]
pub struct HttpFeatureService {
    config: FeatureServiceConfig,
    client: reqwest::Client,
}

impl HttpFeatureService {
    /// Create a client for the given API base URL with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(FeatureServiceConfig::default().base_url(base_url))
    }

    /// Create a client with custom configuration.
    #[must_use]
    pub fn with_config(config: FeatureServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &FeatureServiceConfig {
        &self.config
    }

    /// Build the endpoint URL for a school.
    ///
    /// The `_` query parameter carries the current epoch millis to defeat
    /// intermediary HTTP caches; the feature cache in this crate is the
    /// only cache allowed to answer for the service.
    fn endpoint_url(&self, school_id: &str) -> String {
        let cache_buster = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        format!(
            "{}/schools/{}/features?_={}",
            self.config.base_url.trim_end_matches('/'),
            school_id,
            cache_buster
        )
    }
}

#[async_trait]
impl FeatureService for HttpFeatureService {
    async fn fetch_features(&self, school_id: &str) -> Result<FeatureBundle> {
        let url = self.endpoint_url(school_id);
        tracing::debug!(
            target: "classgate::client",
            school_id = %school_id,
            "Fetching feature bundle"
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AccessError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let envelope: FeaturesEnvelope = serde_json::from_str(&body)?;
        Ok(envelope.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = FeatureServiceConfig::new()
            .base_url("https://api.classgate.io/api/")
            .timeout(Duration::from_secs(3))
            .user_agent("classgate-tests");

        assert_eq!(config.base_url, "https://api.classgate.io/api/");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "classgate-tests");
    }

    #[test]
    fn test_endpoint_url_shape() {
        let service = HttpFeatureService::new("https://api.classgate.io/api/");
        let url = service.endpoint_url("S1");

        assert!(
            url.starts_with("https://api.classgate.io/api/schools/S1/features?_="),
            "{url}"
        );
        // trailing slash on the base must not double up
        assert!(!url.contains("//schools"));
    }

    #[test]
    fn test_envelope_decode() {
        let body = serde_json::json!({
            "features": {
                "schoolId": "S1",
                "subscriptionStatus": "active",
                "subscription": {
                    "name": "Standard Plan",
                    "planType": "standard",
                    "price": 49.0,
                    "currency": "USD",
                    "billingCycle": "monthly"
                },
                "features": serde_json::to_value(crate::bundle::FeatureSet::full()).unwrap(),
                "limits": { "maxStudents": 500, "maxTeachers": 50 }
            }
        });

        let envelope: FeaturesEnvelope = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.features.school_id.as_deref(), Some("S1"));
    }

    // Live test against a running platform API.
    // Run with: cargo test -- --ignored

    #[tokio::test]
    #[ignore = "requires a running feature service"]
    async fn test_fetch_features_live() {
        let service = HttpFeatureService::new("http://localhost:5000/api");
        let bundle = service.fetch_features("demo-school").await.unwrap();
        assert_eq!(bundle.school_id.as_deref(), Some("demo-school"));
    }
}
