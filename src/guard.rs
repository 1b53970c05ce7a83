//! Consumer-facing access gates.
//!
//! [`FeatureGuard`] is the headless equivalent of wrapping a page in a
//! guard component: it owns a tiny state machine
//! (`Resolving -> Granted | Denied`) and a render contract describing what
//! the host UI should draw in each state and mode. [`FeatureAccessHandle`]
//! is the programmatic variant for callers that branch in code instead of
//! wrapping a subtree, and [`AccessDeniedPage`] is the full-page denial
//! used at route level.
//!
//! Resolutions are generation-counted: when the guarded feature set
//! changes while a check is still in flight, the stale check's outcome is
//! discarded instead of clobbering the newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::access::FeatureAccess;
use crate::bundle::SubscriptionInfo;
use crate::catalog::Feature;

/// Route the upgrade call-to-action navigates to.
pub const UPGRADE_ROUTE: &str = "/app/subscription/upgrade";

/// What a guard does with its children when access is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardMode {
    /// Render the fallback (or nothing) instead of the children.
    #[default]
    Hide,
    /// Render the children dimmed and non-interactive, with a lock
    /// indicator.
    Disable,
    /// Render an upgrade prompt naming the denied features.
    ShowMessage,
}

/// Resolution state of one guard instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GuardState {
    /// Access has not been determined yet.
    #[default]
    Resolving,
    Granted,
    Denied {
        /// The guarded features that are not available.
        missing: Vec<Feature>,
        /// Plan details for the upgrade prompt, when requested and
        /// fetchable.
        upgrade: Option<SubscriptionInfo>,
    },
}

impl GuardState {
    #[must_use]
    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving)
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }
}

/// What the host UI should draw for a guard right now.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardRender {
    /// Still resolving: draw a lightweight skeleton, never the children
    /// and never the denial (avoids a flash of wrong content).
    Placeholder,
    /// Access granted: draw the children.
    Content,
    /// Denied in [`GuardMode::Hide`]: draw the fallback, or nothing.
    Fallback,
    /// Denied in [`GuardMode::Disable`]: draw the children dimmed and
    /// blocked, overlaid with a lock indicator.
    LockedContent,
    /// Denied in [`GuardMode::ShowMessage`]: draw an upgrade prompt.
    UpgradePrompt(UpgradePrompt),
}

/// Content of the inline upgrade prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradePrompt {
    /// Display names of the denied features.
    pub features: Vec<String>,
    /// Name of the school's current plan, when known.
    pub current_plan: Option<String>,
    /// Where the upgrade call-to-action navigates.
    pub upgrade_url: String,
}

impl UpgradePrompt {
    #[must_use]
    pub fn new(missing: &[Feature], subscription: Option<&SubscriptionInfo>) -> Self {
        Self {
            features: missing.iter().map(|f| f.display_name().to_string()).collect(),
            current_plan: subscription.map(|s| s.name.clone()),
            upgrade_url: UPGRADE_ROUTE.to_string(),
        }
    }
}

/// Full-page denial, for route-level guards.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessDeniedPage {
    pub title: String,
    pub message: String,
    /// Display names of the denied features.
    pub features: Vec<String>,
    pub current_plan: Option<String>,
    pub upgrade_url: String,
}

impl AccessDeniedPage {
    #[must_use]
    pub fn for_features(missing: &[Feature], subscription: Option<&SubscriptionInfo>) -> Self {
        let features: Vec<String> = missing
            .iter()
            .map(|f| f.display_name().to_string())
            .collect();
        let message = format!(
            "Your current subscription plan does not include: {}. Upgrade your plan to unlock it.",
            features.join(", ")
        );
        Self {
            title: "Feature Not Available".to_string(),
            message,
            features,
            current_plan: subscription.map(|s| s.name.clone()),
            upgrade_url: UPGRADE_ROUTE.to_string(),
        }
    }
}

/// Resolve whether all of `features` are available, returning the missing
/// ones. A single feature takes the cheaper single-lookup path; an empty
/// list is vacuously granted.
async fn resolve_outcome(
    access: &FeatureAccess,
    features: &[Feature],
    school_id: Option<&str>,
) -> (bool, Vec<Feature>) {
    match features {
        [] => (true, Vec::new()),
        [feature] => {
            let allowed = access.has_feature(*feature, school_id).await;
            let missing = if allowed { Vec::new() } else { vec![*feature] };
            (allowed, missing)
        }
        many => {
            let results = access.has_features(many, school_id).await;
            let missing: Vec<Feature> = many
                .iter()
                .copied()
                .filter(|f| !results.get(f).copied().unwrap_or(false))
                .collect();
            (missing.is_empty(), missing)
        }
    }
}

/// A guard instance protecting one UI subtree.
///
/// With several features, ALL of them must be available for access to be
/// granted. Super admins are granted immediately without a query round
/// trip.
pub struct FeatureGuard {
    access: Arc<FeatureAccess>,
    features: RwLock<Vec<Feature>>,
    school_id: Option<String>,
    mode: GuardMode,
    show_upgrade: bool,
    state: RwLock<GuardState>,
    generation: AtomicU64,
}

impl FeatureGuard {
    /// Guard a single feature.
    #[must_use]
    pub fn new(access: Arc<FeatureAccess>, feature: Feature) -> Self {
        Self::for_features(access, [feature])
    }

    /// Guard several features at once (all must be available).
    #[must_use]
    pub fn for_features(
        access: Arc<FeatureAccess>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        Self {
            access,
            features: RwLock::new(features.into_iter().collect()),
            school_id: None,
            mode: GuardMode::default(),
            show_upgrade: false,
            state: RwLock::new(GuardState::Resolving),
            generation: AtomicU64::new(0),
        }
    }

    /// Set the denial rendering mode.
    #[must_use]
    pub fn mode(mut self, mode: GuardMode) -> Self {
        self.mode = mode;
        self
    }

    /// Fetch plan details for the upgrade prompt on denial (best effort;
    /// a failed fetch leaves the prompt without plan info).
    #[must_use]
    pub fn show_upgrade(mut self, show: bool) -> Self {
        self.show_upgrade = show;
        self
    }

    /// Check against an explicit school instead of the session user's.
    #[must_use]
    pub fn school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }

    /// The features currently guarded.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        self.state_read(&self.features, Vec::new)
    }

    /// Current resolution state.
    #[must_use]
    pub fn state(&self) -> GuardState {
        self.state_read(&self.state, GuardState::default)
    }

    fn state_read<T: Clone>(&self, lock: &RwLock<T>, fallback: impl FnOnce() -> T) -> T {
        lock.read().map(|v| v.clone()).unwrap_or_else(|_| fallback())
    }

    fn store_state(&self, next: GuardState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }

    /// Run one resolution attempt and return the resulting state.
    ///
    /// Concurrent attempts are generation-counted: only the newest
    /// attempt's outcome is kept, however the service calls interleave.
    pub async fn resolve(&self) -> GuardState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.store_state(GuardState::Resolving);

        let is_super_admin = self
            .access
            .current_user()
            .map(|u| u.role.is_super_admin())
            .unwrap_or(false);
        if is_super_admin {
            return self.commit(generation, GuardState::Granted);
        }

        let features = self.features();
        let school_id = self.school_id.as_deref();
        let (allowed, missing) = resolve_outcome(&self.access, &features, school_id).await;

        let next = if allowed {
            GuardState::Granted
        } else {
            let upgrade = if self.show_upgrade {
                self.access.subscription_info(school_id).await
            } else {
                None
            };
            GuardState::Denied { missing, upgrade }
        };
        self.commit(generation, next)
    }

    fn commit(&self, generation: u64, next: GuardState) -> GuardState {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.store_state(next.clone());
            next
        } else {
            tracing::debug!(
                target: "classgate::guard",
                generation,
                "Discarding stale access resolution"
            );
            self.state()
        }
    }

    /// Swap the guarded features and re-resolve (the equivalent of the
    /// guarded prop changing).
    pub async fn set_features(
        &self,
        features: impl IntoIterator<Item = Feature>,
    ) -> GuardState {
        if let Ok(mut slot) = self.features.write() {
            *slot = features.into_iter().collect();
        }
        self.resolve().await
    }

    /// What the host UI should draw right now, given the state and mode.
    #[must_use]
    pub fn render(&self) -> GuardRender {
        match self.state() {
            GuardState::Resolving => GuardRender::Placeholder,
            GuardState::Granted => GuardRender::Content,
            GuardState::Denied { missing, upgrade } => match self.mode {
                GuardMode::Hide => GuardRender::Fallback,
                GuardMode::Disable => GuardRender::LockedContent,
                GuardMode::ShowMessage => {
                    GuardRender::UpgradePrompt(UpgradePrompt::new(&missing, upgrade.as_ref()))
                }
            },
        }
    }
}

/// Snapshot of a [`FeatureAccessHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureAccessState {
    /// `None` until the first check completes.
    pub has_access: Option<bool>,
    pub loading: bool,
    /// Plan details, populated on denial for upgrade UI.
    pub subscription_info: Option<SubscriptionInfo>,
}

impl Default for FeatureAccessState {
    fn default() -> Self {
        Self {
            has_access: None,
            loading: true,
            subscription_info: None,
        }
    }
}

/// Programmatic access checking for callers that branch in code rather
/// than wrapping a subtree in a [`FeatureGuard`].
pub struct FeatureAccessHandle {
    access: Arc<FeatureAccess>,
    features: Vec<Feature>,
    school_id: Option<String>,
    state: RwLock<FeatureAccessState>,
    generation: AtomicU64,
}

impl FeatureAccessHandle {
    #[must_use]
    pub fn new(access: Arc<FeatureAccess>, feature: Feature) -> Self {
        Self::for_features(access, [feature])
    }

    #[must_use]
    pub fn for_features(
        access: Arc<FeatureAccess>,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        Self {
            access,
            features: features.into_iter().collect(),
            school_id: None,
            state: RwLock::new(FeatureAccessState::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Check against an explicit school instead of the session user's.
    #[must_use]
    pub fn school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }

    /// The last known state without triggering a check.
    #[must_use]
    pub fn snapshot(&self) -> FeatureAccessState {
        self.state
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Run an access check and return the updated state.
    ///
    /// Stale checks are discarded the same way guard resolutions are.
    pub async fn recheck(&self) -> FeatureAccessState {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut state) = self.state.write() {
            state.loading = true;
        }

        let is_super_admin = self
            .access
            .current_user()
            .map(|u| u.role.is_super_admin())
            .unwrap_or(false);

        let next = if is_super_admin {
            FeatureAccessState {
                has_access: Some(true),
                loading: false,
                subscription_info: None,
            }
        } else {
            let school_id = self.school_id.as_deref();
            let (allowed, _missing) =
                resolve_outcome(&self.access, &self.features, school_id).await;
            let subscription_info = if allowed {
                None
            } else {
                self.access.subscription_info(school_id).await
            };
            FeatureAccessState {
                has_access: Some(allowed),
                loading: false,
                subscription_info,
            }
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            if let Ok(mut state) = self.state.write() {
                *state = next.clone();
            }
            next
        } else {
            tracing::debug!(
                target: "classgate::guard",
                generation,
                "Discarding stale access recheck"
            );
            self.snapshot()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CurrentUser, Role, StaticUserProvider};
    use crate::testing::{school_bundle, MockFeatureService};

    fn access_for(service: &MockFeatureService, user: CurrentUser) -> Arc<FeatureAccess> {
        Arc::new(FeatureAccess::new(
            Arc::new(service.clone()),
            Arc::new(StaticUserProvider::new(user)),
        ))
    }

    #[tokio::test]
    async fn test_guard_grants_single_feature() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Attendance]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Attendance);
        assert!(guard.state().is_resolving());
        assert_eq!(guard.render(), GuardRender::Placeholder);

        let state = guard.resolve().await;
        assert!(state.is_granted());
        assert_eq!(guard.render(), GuardRender::Content);
    }

    #[tokio::test]
    async fn test_guard_hide_mode_falls_back() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Fees);
        guard.resolve().await;

        assert!(guard.state().is_denied());
        assert_eq!(guard.render(), GuardRender::Fallback);
    }

    #[tokio::test]
    async fn test_guard_disable_mode_locks_content() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Fees).mode(GuardMode::Disable);
        guard.resolve().await;

        assert_eq!(guard.render(), GuardRender::LockedContent);
    }

    #[tokio::test]
    async fn test_guard_show_message_names_features() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
        let access = access_for(&service, CurrentUser::with_school(Role::SchoolAdmin, "S1"));

        let guard = FeatureGuard::new(access, Feature::Reports)
            .mode(GuardMode::ShowMessage)
            .show_upgrade(true);
        guard.resolve().await;

        match guard.render() {
            GuardRender::UpgradePrompt(prompt) => {
                assert_eq!(prompt.features, vec!["Reports & Analytics".to_string()]);
                assert_eq!(prompt.current_plan.as_deref(), Some("Standard Plan"));
                assert_eq!(prompt.upgrade_url, UPGRADE_ROUTE);
            }
            other => panic!("expected upgrade prompt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_all_of_semantics() {
        let service = MockFeatureService::new();
        service.insert_bundle(
            "S1",
            school_bundle("S1", &[Feature::Homework, Feature::Reports]),
        );
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let both = FeatureGuard::for_features(
            access.clone(),
            [Feature::Homework, Feature::Reports],
        );
        assert!(both.resolve().await.is_granted());

        let with_missing = FeatureGuard::for_features(
            access,
            [Feature::Homework, Feature::Fees],
        );
        let state = with_missing.resolve().await;
        match state {
            GuardState::Denied { missing, .. } => assert_eq!(missing, vec![Feature::Fees]),
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_guard_super_admin_short_circuits() {
        let service = MockFeatureService::new();
        let access = access_for(&service, CurrentUser::new(Role::SuperAdmin));

        let guard = FeatureGuard::new(access, Feature::ApiAccess);
        assert!(guard.resolve().await.is_granted());
        assert_eq!(service.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_guard_feature_change_re_resolves() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Homework]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Homework);
        assert!(guard.resolve().await.is_granted());

        let state = guard.set_features([Feature::Fees]).await;
        assert!(state.is_denied());
        assert_eq!(guard.features(), vec![Feature::Fees]);
    }

    #[tokio::test]
    async fn test_guard_trusts_query_layer_fallback() {
        let failing = MockFeatureService::new();
        failing.set_failing(true);
        let access = access_for(&failing, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Attendance);
        let state = guard.resolve().await;
        assert!(state.is_denied(), "errors resolve like a denial");
    }

    #[tokio::test]
    async fn test_denied_upgrade_info_is_best_effort() {
        let failing = MockFeatureService::new();
        failing.set_failing(true);
        let access = access_for(&failing, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Reports)
            .mode(GuardMode::ShowMessage)
            .show_upgrade(true);
        guard.resolve().await;

        match guard.render() {
            GuardRender::UpgradePrompt(prompt) => {
                assert_eq!(prompt.current_plan, None, "info fetch failure must not block");
            }
            other => panic!("expected upgrade prompt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_resolution_is_discarded() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Homework]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let guard = FeatureGuard::new(access, Feature::Fees);

        // A newer generation started before the old outcome commits.
        let stale_generation = guard.generation.fetch_add(1, Ordering::SeqCst) + 1;
        guard.generation.fetch_add(1, Ordering::SeqCst);

        let result = guard.commit(stale_generation, GuardState::Granted);
        assert!(
            result.is_resolving(),
            "stale commit must not change the displayed state"
        );
    }

    #[tokio::test]
    async fn test_handle_mirrors_hook_contract() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Homework]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let handle = FeatureAccessHandle::new(access, Feature::Homework);
        let initial = handle.snapshot();
        assert_eq!(initial.has_access, None);
        assert!(initial.loading);

        let state = handle.recheck().await;
        assert_eq!(state.has_access, Some(true));
        assert!(!state.loading);
        assert_eq!(state.subscription_info, None);
    }

    #[tokio::test]
    async fn test_handle_denial_carries_subscription_info() {
        let service = MockFeatureService::new();
        service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
        let access = access_for(&service, CurrentUser::with_school(Role::Teacher, "S1"));

        let handle = FeatureAccessHandle::new(access, Feature::Fees);
        let state = handle.recheck().await;
        assert_eq!(state.has_access, Some(false));
        assert_eq!(
            state.subscription_info.map(|s| s.name),
            Some("Standard Plan".to_string())
        );
    }

    #[test]
    fn test_access_denied_page_wording() {
        let page = AccessDeniedPage::for_features(&[Feature::Reports], None);
        assert_eq!(page.title, "Feature Not Available");
        assert!(page.message.contains("Reports & Analytics"));
        assert_eq!(page.upgrade_url, "/app/subscription/upgrade");
    }
}
