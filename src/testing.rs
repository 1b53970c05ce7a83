//! Testing utilities for feature-access consumers.
//!
//! Everything here is also used by this crate's own test suites: a
//! scriptable [`MockFeatureService`] that counts fetches, a [`ManualClock`]
//! for expiring cache entries without sleeping, and bundle factories.
//!
//! # Example
//!
//! ```rust,ignore
//! use classgate::testing::{school_bundle, MockFeatureService};
//! use classgate::{Feature, FeatureAccess, StaticUserProvider};
//!
//! let service = MockFeatureService::new();
//! service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
//!
//! let access = FeatureAccess::new(Arc::new(service.clone()), provider);
//! assert!(access.has_feature(Feature::Dashboard, None).await);
//! assert_eq!(service.fetch_count(), 1);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::bundle::{
    BillingCycle, FeatureBundle, FeatureSet, PlanInfo, PlanType, SubscriptionStatus, UsageLimits,
};
use crate::cache::Clock;
use crate::catalog::Feature;
use crate::client::FeatureService;
use crate::error::{AccessError, Result};

/// In-memory feature service with scriptable responses.
///
/// Clones share state, so a handle kept by the test observes fetches made
/// through the handle given to the query layer.
#[derive(Clone, Default)]
pub struct MockFeatureService {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    bundles: RwLock<HashMap<String, FeatureBundle>>,
    failing: RwLock<bool>,
    fetches: AtomicUsize,
}

impl MockFeatureService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the bundle returned for a school.
    pub fn insert_bundle(&self, school_id: impl Into<String>, bundle: FeatureBundle) {
        if let Ok(mut bundles) = self.inner.bundles.write() {
            bundles.insert(school_id.into(), bundle);
        }
    }

    /// Make every subsequent fetch fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.inner.failing.write() {
            *flag = failing;
        }
    }

    /// Number of fetches attempted so far, including failed ones.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureService for MockFeatureService {
    async fn fetch_features(&self, school_id: &str) -> Result<FeatureBundle> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);

        if self.inner.failing.read().map(|f| *f).unwrap_or(false) {
            return Err(AccessError::connection("simulated connection failure"));
        }

        self.inner
            .bundles
            .read()
            .ok()
            .and_then(|bundles| bundles.get(school_id).cloned())
            .ok_or(AccessError::UpstreamStatus { status: 404 })
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    inner: Arc<ManualClockInner>,
}

struct ManualClockInner {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManualClockInner {
                start: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.inner.offset.lock() {
            *offset += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.inner.offset.lock().map(|o| *o).unwrap_or_default();
        self.inner.start + offset
    }
}

/// An active standard-plan bundle for a school with the given features
/// enabled.
#[must_use]
pub fn school_bundle(school_id: &str, available: &[Feature]) -> FeatureBundle {
    FeatureBundle {
        school_id: Some(school_id.to_string()),
        subscription_status: SubscriptionStatus::Active,
        subscription: PlanInfo {
            name: "Standard Plan".to_string(),
            plan_type: PlanType::Standard,
            price: 49.0,
            currency: "USD".to_string(),
            billing_cycle: BillingCycle::Monthly,
        },
        features: FeatureSet::from_available(available.iter().copied()),
        limits: UsageLimits {
            max_students: Some(500),
            max_teachers: Some(50),
        },
    }
}
