//! The feature bundle: one school's complete access snapshot.
//!
//! A bundle carries the subscription state, the enabled/disabled feature
//! partition, and the plan's usage limits. Bundles come from the feature
//! service (see [`crate::client`]) or from the two synthetic policies:
//! [`FeatureBundle::all_access`] for super admins inspecting no particular
//! school, and [`FeatureBundle::minimal_access`] for school users with no
//! school assigned.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::catalog::Feature;

/// Features granted to a school user with no school assigned.
///
/// Deliberately hardcoded rather than server-driven; change it here if
/// product ever wants the fallback to differ.
pub const UNASSIGNED_SCHOOL_FEATURES: [Feature; 2] = [Feature::Dashboard, Feature::Complaints];

/// Subscription lifecycle state as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

impl SubscriptionStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Pricing tier of a plan. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Trial,
    Basic,
    Standard,
    Premium,
}

/// How often a plan bills. Display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Quarterly,
    Yearly,
}

/// Descriptive plan metadata. Nothing here affects access decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanInfo {
    pub name: String,
    pub plan_type: PlanType,
    pub price: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
}

/// The enabled/disabled partition of the feature catalog.
///
/// Only the enabled set is stored; `available`, `unavailable` and the
/// per-feature map are views over it, so the partition invariant (every
/// catalog feature in exactly one side) holds by construction. The wire
/// codec still sends all three fields and decoding verifies they agree —
/// a service response that contradicts itself is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    enabled: BTreeSet<Feature>,
}

impl FeatureSet {
    /// Build a set from the enabled features; everything else in the
    /// catalog is unavailable.
    #[must_use]
    pub fn from_available<I>(features: I) -> Self
    where
        I: IntoIterator<Item = Feature>,
    {
        Self {
            enabled: features.into_iter().collect(),
        }
    }

    /// The entire catalog, enabled.
    #[must_use]
    pub fn full() -> Self {
        Self::from_available(Feature::ALL)
    }

    /// Check whether a feature is enabled.
    #[must_use]
    pub fn contains(&self, feature: Feature) -> bool {
        self.enabled.contains(&feature)
    }

    /// Enabled features, in catalog order.
    #[must_use]
    pub fn available(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|f| self.enabled.contains(f))
            .collect()
    }

    /// Disabled features, in catalog order.
    #[must_use]
    pub fn unavailable(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|f| !self.enabled.contains(f))
            .collect()
    }

    /// The full catalog as a feature -> enabled map.
    #[must_use]
    pub fn all(&self) -> BTreeMap<Feature, bool> {
        Feature::ALL
            .iter()
            .map(|f| (*f, self.enabled.contains(f)))
            .collect()
    }

    /// Number of enabled features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Wire shape of a feature set: the backend sends the partition
/// redundantly and the client checks it for consistency.
#[derive(Serialize, Deserialize)]
struct FeatureSetWire {
    available: Vec<Feature>,
    unavailable: Vec<Feature>,
    all: BTreeMap<Feature, bool>,
}

impl Serialize for FeatureSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FeatureSetWire {
            available: self.available(),
            unavailable: self.unavailable(),
            all: self.all(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FeatureSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = FeatureSetWire::deserialize(deserializer)?;
        let available: BTreeSet<Feature> = wire.available.into_iter().collect();
        let unavailable: BTreeSet<Feature> = wire.unavailable.into_iter().collect();

        for feature in Feature::ALL {
            match (available.contains(&feature), unavailable.contains(&feature)) {
                (true, true) => {
                    return Err(D::Error::custom(format!(
                        "feature '{}' is both available and unavailable",
                        feature
                    )));
                }
                (false, false) => {
                    return Err(D::Error::custom(format!(
                        "feature '{}' is missing from the partition",
                        feature
                    )));
                }
                _ => {}
            }

            let flagged = wire.all.get(&feature).copied().ok_or_else(|| {
                D::Error::custom(format!("feature '{}' is missing from 'all'", feature))
            })?;
            if flagged != available.contains(&feature) {
                return Err(D::Error::custom(format!(
                    "feature '{}' disagrees between 'all' and 'available'",
                    feature
                )));
            }
        }

        Ok(FeatureSet { enabled: available })
    }
}

/// Per-plan usage ceilings. `None` means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimits {
    #[serde(default)]
    pub max_students: Option<u32>,
    #[serde(default)]
    pub max_teachers: Option<u32>,
}

impl UsageLimits {
    /// No ceilings at all.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Everything capped at zero.
    #[must_use]
    pub fn none_allowed() -> Self {
        Self {
            max_students: Some(0),
            max_teachers: Some(0),
        }
    }

    /// Check current student count against the plan ceiling.
    #[must_use]
    pub fn check_students(&self, current: u32) -> LimitCheck {
        LimitCheck::evaluate(self.max_students, current)
    }

    /// Check current teacher count against the plan ceiling.
    #[must_use]
    pub fn check_teachers(&self, current: u32) -> LimitCheck {
        LimitCheck::evaluate(self.max_teachers, current)
    }
}

/// Result of checking usage against a plan ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitCheck {
    /// No ceiling on this resource.
    Unlimited,
    /// Usage is below the ceiling.
    Within { current: u32, max: u32 },
    /// Usage has reached or passed the ceiling.
    AtLimit { current: u32, max: u32 },
}

impl LimitCheck {
    fn evaluate(limit: Option<u32>, current: u32) -> Self {
        match limit {
            None => Self::Unlimited,
            Some(max) if current < max => Self::Within { current, max },
            Some(max) => Self::AtLimit { current, max },
        }
    }

    /// Check if one more of the resource is allowed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Unlimited | Self::Within { .. })
    }

    #[must_use]
    pub fn is_at_limit(&self) -> bool {
        matches!(self, Self::AtLimit { .. })
    }
}

/// Projection of a bundle for display: plan metadata plus status and
/// limits, without the feature partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub name: String,
    pub plan_type: PlanType,
    pub price: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    pub limits: UsageLimits,
}

/// One school's complete access snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureBundle {
    /// The tenant school, or `None` for the super-admin synthetic bundle.
    #[serde(default)]
    pub school_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub subscription: PlanInfo,
    pub features: FeatureSet,
    pub limits: UsageLimits,
}

impl FeatureBundle {
    /// The synthetic bundle handed to super admins with no school in
    /// context: every feature enabled, no limits, always active.
    #[must_use]
    pub fn all_access() -> Self {
        Self {
            school_id: None,
            subscription_status: SubscriptionStatus::Active,
            subscription: PlanInfo {
                name: "Super Admin Access".to_string(),
                plan_type: PlanType::Premium,
                price: 0.0,
                currency: "USD".to_string(),
                billing_cycle: BillingCycle::Yearly,
            },
            features: FeatureSet::full(),
            limits: UsageLimits::unlimited(),
        }
    }

    /// The synthetic bundle for a school user with no school assigned:
    /// least privilege instead of an error.
    #[must_use]
    pub fn minimal_access() -> Self {
        Self {
            school_id: None,
            subscription_status: SubscriptionStatus::Inactive,
            subscription: PlanInfo {
                name: "No Active Plan".to_string(),
                plan_type: PlanType::Basic,
                price: 0.0,
                currency: "USD".to_string(),
                billing_cycle: BillingCycle::Monthly,
            },
            features: FeatureSet::from_available(UNASSIGNED_SCHOOL_FEATURES),
            limits: UsageLimits::none_allowed(),
        }
    }

    /// Check whether a feature is enabled in this bundle.
    #[must_use]
    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }

    /// Project the display-facing subscription info out of this bundle.
    #[must_use]
    pub fn subscription_info(&self) -> SubscriptionInfo {
        SubscriptionInfo {
            name: self.subscription.name.clone(),
            plan_type: self.subscription.plan_type,
            price: self.subscription.price,
            currency: self.subscription.currency.clone(),
            billing_cycle: self.subscription.billing_cycle,
            status: self.subscription_status,
            limits: self.limits,
        }
    }
}
