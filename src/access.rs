//! The feature query layer.
//!
//! [`FeatureAccess`] answers "does the current context have access to
//! feature F" with one documented fallback policy, independent of any UI:
//!
//! - Super admins with no school in context get a synthetic all-access
//!   bundle without touching the cache or the network.
//! - Non-super-admins with no school get a synthetic least-privilege
//!   bundle (see [`UNASSIGNED_SCHOOL_FEATURES`]) instead of an error.
//! - Real schools resolve through the TTL cache, then the feature
//!   service. Transport failures propagate out of [`school_features`] but
//!   are absorbed one level up: [`has_feature`] and [`has_features`] fail
//!   open for super admins and closed for everyone else, and
//!   [`subscription_info`] degrades to `None`.
//!
//! [`school_features`]: FeatureAccess::school_features
//! [`has_feature`]: FeatureAccess::has_feature
//! [`has_features`]: FeatureAccess::has_features
//! [`subscription_info`]: FeatureAccess::subscription_info
//! [`UNASSIGNED_SCHOOL_FEATURES`]: crate::bundle::UNASSIGNED_SCHOOL_FEATURES

use std::collections::HashMap;
use std::sync::Arc;

use crate::bundle::{FeatureBundle, SubscriptionInfo};
use crate::cache::FeatureCache;
use crate::catalog::Feature;
use crate::client::FeatureService;
use crate::config::AccessConfig;
use crate::error::Result;
use crate::session::{CurrentUser, CurrentUserProvider};

/// Entry point for feature-access checks.
///
/// One instance is shared by every guard and caller in the process; its
/// cache is likewise shared, so a `refresh_features` call in one corner of
/// the app invalidates the bundle for everyone (they silently refetch on
/// their next access).
pub struct FeatureAccess {
    service: Arc<dyn FeatureService>,
    users: Arc<dyn CurrentUserProvider>,
    cache: FeatureCache,
}

impl FeatureAccess {
    /// Create a query layer with the default five-minute cache.
    #[must_use]
    pub fn new(service: Arc<dyn FeatureService>, users: Arc<dyn CurrentUserProvider>) -> Self {
        Self::with_cache(service, users, FeatureCache::default())
    }

    /// Create a query layer with a custom cache (mainly for tests that
    /// need a controllable clock).
    #[must_use]
    pub fn with_cache(
        service: Arc<dyn FeatureService>,
        users: Arc<dyn CurrentUserProvider>,
        cache: FeatureCache,
    ) -> Self {
        Self {
            service,
            users,
            cache,
        }
    }

    /// Wire up the HTTP feature service from configuration.
    #[must_use]
    pub fn from_config(config: &AccessConfig, users: Arc<dyn CurrentUserProvider>) -> Self {
        Self::with_cache(
            Arc::new(config.feature_service()),
            users,
            FeatureCache::new(config.cache_ttl),
        )
    }

    /// The signed-in user, as seen by this layer.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.users.current_user()
    }

    fn is_super_admin(&self) -> bool {
        self.current_user()
            .map(|u| u.role.is_super_admin())
            .unwrap_or(false)
    }

    /// Resolve the feature bundle for a school.
    ///
    /// `school_id` overrides the user's own school (elevated roles
    /// inspecting another tenant); when omitted, the school comes from the
    /// current user context.
    ///
    /// # Errors
    ///
    /// Fails only when a concrete school's bundle has to be fetched and
    /// the service call or decode fails. The synthetic super-admin and
    /// least-privilege paths never fail.
    pub async fn school_features(&self, school_id: Option<&str>) -> Result<FeatureBundle> {
        let user = self.current_user();
        let is_super_admin = user
            .as_ref()
            .map(|u| u.role.is_super_admin())
            .unwrap_or(false);
        let target = school_id
            .map(str::to_owned)
            .or_else(|| user.as_ref().and_then(|u| u.school_id.clone()));

        let target = match target {
            Some(target) => target,
            None if is_super_admin => {
                tracing::debug!(
                    target: "classgate::access",
                    "No school in context, issuing super admin all-access bundle"
                );
                return Ok(FeatureBundle::all_access());
            }
            None => {
                tracing::debug!(
                    target: "classgate::access",
                    "No school in context, issuing least-privilege bundle"
                );
                return Ok(FeatureBundle::minimal_access());
            }
        };

        if let Some(bundle) = self.cache.read(&target) {
            tracing::debug!(
                target: "classgate::access",
                school_id = %target,
                "Feature cache hit"
            );
            return Ok(bundle);
        }

        let bundle = self.service.fetch_features(&target).await?;
        self.cache.write(&target, bundle.clone());
        Ok(bundle)
    }

    /// Check whether a feature is available in the current context.
    ///
    /// Never fails: on any resolution error, super admins are granted
    /// (they must not be locked out by a backend hiccup) and every other
    /// role is denied.
    pub async fn has_feature(&self, feature: Feature, school_id: Option<&str>) -> bool {
        match self.school_features(school_id).await {
            Ok(bundle) => bundle.has_feature(feature),
            Err(e) => {
                let fail_open = self.is_super_admin();
                tracing::warn!(
                    target: "classgate::access",
                    error = %e,
                    feature = %feature,
                    fail_open,
                    "Feature lookup failed, applying role fallback"
                );
                fail_open
            }
        }
    }

    /// Check several features with a single bundle resolution.
    ///
    /// On error the whole batch maps to the super-admin fallback uniformly
    /// (not per feature). That mirrors the single-feature policy; whether
    /// a partial result would ever be preferable is a product question,
    /// not a bug to fix here.
    pub async fn has_features(
        &self,
        features: &[Feature],
        school_id: Option<&str>,
    ) -> HashMap<Feature, bool> {
        match self.school_features(school_id).await {
            Ok(bundle) => features
                .iter()
                .map(|f| (*f, bundle.has_feature(*f)))
                .collect(),
            Err(e) => {
                let fail_open = self.is_super_admin();
                tracing::warn!(
                    target: "classgate::access",
                    error = %e,
                    features = features.len(),
                    fail_open,
                    "Batch feature lookup failed, applying role fallback"
                );
                features.iter().map(|f| (*f, fail_open)).collect()
            }
        }
    }

    /// Subscription details for display. Purely descriptive, so failures
    /// degrade to `None` rather than to a role-based decision.
    pub async fn subscription_info(&self, school_id: Option<&str>) -> Option<SubscriptionInfo> {
        match self.school_features(school_id).await {
            Ok(bundle) => Some(bundle.subscription_info()),
            Err(e) => {
                tracing::warn!(
                    target: "classgate::access",
                    error = %e,
                    "Subscription info lookup failed"
                );
                None
            }
        }
    }

    /// Drop the cached bundle and force a round trip to the service.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`FeatureAccess::school_features`].
    pub async fn refresh_features(&self, school_id: Option<&str>) -> Result<FeatureBundle> {
        let target = school_id.map(str::to_owned).or_else(|| {
            self.current_user()
                .and_then(|u| u.school_id)
        });

        match target {
            Some(target) => self.cache.invalidate(&target),
            None => self.cache.clear(),
        }

        self.school_features(school_id).await
    }

    /// Drop every cached bundle. Also handy as a debugging hook.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of schools currently cached.
    #[must_use]
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}
