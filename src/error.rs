//! Error types for the feature-access core.
//!
//! The only fallible operation in this crate is resolving a real school's
//! feature bundle over the network; everything above that layer degrades
//! by policy instead of surfacing errors (see [`crate::access`]).

use serde::{Deserialize, Serialize};

/// The main error type for feature-access operations.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The feature service could not be reached.
    #[error("Feature service unreachable: {0}")]
    Connection(String),

    /// The feature service did not answer within the client timeout.
    #[error("Feature service request timed out")]
    Timeout,

    /// The feature service answered with a non-success HTTP status.
    #[error("Feature service returned status {status}")]
    UpstreamStatus { status: u16 },

    /// The response body could not be decoded into a valid feature bundle.
    #[error("Malformed feature bundle: {0}")]
    InvalidBundle(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccessError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn invalid_bundle(msg: impl Into<String>) -> Self {
        Self::InvalidBundle(msg.into())
    }

    /// Check if this error originated in transport rather than in the
    /// response payload.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Timeout | Self::UpstreamStatus { .. }
        )
    }

    /// Check if retrying the request could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::UpstreamStatus { status } => {
                matches!(status, 429 | 500..=599)
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AccessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AccessError::Timeout
        } else if err.is_status() {
            match err.status() {
                Some(status) => AccessError::UpstreamStatus {
                    status: status.as_u16(),
                },
                None => AccessError::Connection(format!("HTTP error: {}", err)),
            }
        } else if err.is_connect() {
            AccessError::Connection(format!("Connection error: {}", err))
        } else {
            AccessError::Connection(format!("Request error: {}", err))
        }
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        AccessError::InvalidBundle(err.to_string())
    }
}

/// Result type alias for feature-access operations.
pub type Result<T> = std::result::Result<T, AccessError>;

/// Error codes shared with the platform's generic API client.
///
/// When an unrelated API call is rejected with HTTP 403, the backend tags
/// the response with one of these codes so the client can tell a blocked
/// feature apart from a lapsed subscription. This crate never raises them
/// itself; the contract lives here so both sides name the codes the same
/// way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    /// The feature is not part of the school's subscription plan.
    FeatureNotAvailable,
    /// The school's subscription is lapsed or suspended.
    SubscriptionInactive,
}

impl ApiErrorCode {
    /// The wire representation of this code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureNotAvailable => "FEATURE_NOT_AVAILABLE",
            Self::SubscriptionInactive => "SUBSCRIPTION_INACTIVE",
        }
    }

    /// Parse a wire code, returning `None` for anything unrecognised.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "FEATURE_NOT_AVAILABLE" => Some(Self::FeatureNotAvailable),
            "SUBSCRIPTION_INACTIVE" => Some(Self::SubscriptionInactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AccessError::UpstreamStatus { status: 503 };
        assert_eq!(err.to_string(), "Feature service returned status 503");

        let err = AccessError::invalid_bundle("missing field `features`");
        assert_eq!(
            err.to_string(),
            "Malformed feature bundle: missing field `features`"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(AccessError::Timeout.is_transport());
        assert!(AccessError::Timeout.is_retryable());

        assert!(AccessError::UpstreamStatus { status: 503 }.is_retryable());
        assert!(AccessError::UpstreamStatus { status: 429 }.is_retryable());
        assert!(!AccessError::UpstreamStatus { status: 404 }.is_retryable());

        let decode = AccessError::invalid_bundle("bad json");
        assert!(!decode.is_transport());
        assert!(!decode.is_retryable());
    }

    #[test]
    fn test_from_serde_json_error() {
        let result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ not json }");
        let err: AccessError = result.unwrap_err().into();
        assert!(matches!(err, AccessError::InvalidBundle(_)));
    }

    #[test]
    fn test_from_anyhow() {
        let err: AccessError = anyhow::anyhow!("custom store exploded").into();
        assert!(matches!(err, AccessError::Internal(_)));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_api_error_code_round_trip() {
        assert_eq!(
            ApiErrorCode::FeatureNotAvailable.as_str(),
            "FEATURE_NOT_AVAILABLE"
        );
        assert_eq!(
            ApiErrorCode::parse("SUBSCRIPTION_INACTIVE"),
            Some(ApiErrorCode::SubscriptionInactive)
        );
        assert_eq!(ApiErrorCode::parse("SOMETHING_ELSE"), None);
    }

    #[test]
    fn test_api_error_code_serde() {
        let json = serde_json::to_string(&ApiErrorCode::FeatureNotAvailable).unwrap();
        assert_eq!(json, "\"FEATURE_NOT_AVAILABLE\"");

        let code: ApiErrorCode = serde_json::from_str("\"SUBSCRIPTION_INACTIVE\"").unwrap();
        assert_eq!(code, ApiErrorCode::SubscriptionInactive);
    }
}
