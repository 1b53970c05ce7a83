//! Classgate - feature-access core for the Classgate school platform
//!
//! Classgate is a multi-tenant school management SaaS; this crate is the
//! client-side core that decides which parts of the product a school's
//! subscription plan has switched on. It is deliberately headless: the
//! guard layer produces render *decisions*, and the host UI draws them.
//!
//! # Features
//!
//! - **Feature catalog**: the closed set of plan-gated capabilities with
//!   display names
//! - **Query layer**: cached access checks with role-aware fallback
//!   (super admins fail open, everyone else fails closed)
//! - **TTL cache**: per-school bundle caching with an injectable clock
//! - **Guards**: headless `Resolving -> Granted | Denied` state machines
//!   with hide/disable/show-message render contracts
//! - **Testing**: scriptable mock service and manual clock, exported for
//!   consumers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use classgate::{
//!     AccessConfig, CurrentUser, Feature, FeatureAccess, Role, SharedUserProvider,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     classgate::init_tracing();
//!
//!     let session = SharedUserProvider::new();
//!     session.sign_in(CurrentUser::with_school(Role::Teacher, "S1"));
//!
//!     let config = AccessConfig::builder().from_env().build();
//!     let access = FeatureAccess::from_config(&config, Arc::new(session));
//!
//!     if access.has_feature(Feature::Attendance, None).await {
//!         // show the attendance register
//!     }
//! }
//! ```

pub mod access;
pub mod bundle;
pub mod cache;
pub mod catalog;
pub mod client;
mod config;
mod error;
pub mod guard;
pub mod session;
pub mod testing;

// Re-exports for the public API
pub use access::FeatureAccess;
pub use bundle::{
    BillingCycle, FeatureBundle, FeatureSet, LimitCheck, PlanInfo, PlanType, SubscriptionInfo,
    SubscriptionStatus, UsageLimits, UNASSIGNED_SCHOOL_FEATURES,
};
pub use cache::{Clock, FeatureCache, SystemClock, DEFAULT_CACHE_TTL};
pub use catalog::{Feature, UnknownFeature};
pub use client::{FeatureService, FeatureServiceConfig, HttpFeatureService};
pub use config::{AccessConfig, AccessConfigBuilder};
pub use error::{AccessError, ApiErrorCode, Result};
pub use guard::{
    AccessDeniedPage, FeatureAccessHandle, FeatureAccessState, FeatureGuard, GuardMode,
    GuardRender, GuardState, UpgradePrompt, UPGRADE_ROUTE,
};
pub use session::{
    CurrentUser, CurrentUserProvider, Role, SharedUserProvider, StaticUserProvider,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging with sensible defaults
///
/// Call this early in your application, before wiring up the access
/// layer.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "classgate=debug")
/// - `CLASSGATE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("CLASSGATE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
