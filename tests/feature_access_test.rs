use std::sync::Arc;
use std::time::Duration;

use classgate::testing::{school_bundle, ManualClock, MockFeatureService};
use classgate::{
    CurrentUser, Feature, FeatureAccess, FeatureCache, PlanType, Role, StaticUserProvider,
    SubscriptionStatus, DEFAULT_CACHE_TTL,
};

fn access_with(service: &MockFeatureService, user: CurrentUser) -> FeatureAccess {
    FeatureAccess::new(
        Arc::new(service.clone()),
        Arc::new(StaticUserProvider::new(user)),
    )
}

#[tokio::test]
async fn test_teacher_school_checks_end_to_end() {
    let service = MockFeatureService::new();
    service.insert_bundle(
        "S1",
        school_bundle("S1", &[Feature::Dashboard, Feature::Attendance]),
    );
    let access = access_with(&service, CurrentUser::with_school(Role::Teacher, "S1"));

    assert!(access.has_feature(Feature::Attendance, None).await);
    assert!(!access.has_feature(Feature::Fees, None).await);

    // both checks share one fetch through the cache
    assert_eq!(service.fetch_count(), 1);
}

#[tokio::test]
async fn test_super_admin_subscription_info_end_to_end() {
    let service = MockFeatureService::new();
    let access = access_with(&service, CurrentUser::new(Role::SuperAdmin));

    let info = access.subscription_info(None).await.unwrap();
    assert_eq!(info.name, "Super Admin Access");
    assert_eq!(info.plan_type, PlanType::Premium);
    assert_eq!(info.status, SubscriptionStatus::Active);
    assert_eq!(info.limits.max_students, None);
    assert_eq!(info.limits.max_teachers, None);
    assert_eq!(service.fetch_count(), 0);
}

#[tokio::test]
async fn test_cache_window_and_expiry() {
    let service = MockFeatureService::new();
    service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
    let clock = ManualClock::new();
    let access = FeatureAccess::with_cache(
        Arc::new(service.clone()),
        Arc::new(StaticUserProvider::new(CurrentUser::with_school(
            Role::Teacher,
            "S1",
        ))),
        FeatureCache::with_clock(DEFAULT_CACHE_TTL, Arc::new(clock.clone())),
    );

    access.school_features(None).await.unwrap();
    access.school_features(None).await.unwrap();
    assert_eq!(service.fetch_count(), 1, "second call inside the TTL is served from cache");

    clock.advance(Duration::from_secs(5 * 60));
    access.school_features(None).await.unwrap();
    assert_eq!(service.fetch_count(), 2, "expiry forces a refetch");
}

#[tokio::test]
async fn test_clear_cache_always_refetches() {
    let service = MockFeatureService::new();
    service.insert_bundle("S1", school_bundle("S1", &[Feature::Dashboard]));
    let access = access_with(&service, CurrentUser::with_school(Role::Teacher, "S1"));

    access.school_features(None).await.unwrap();
    access.clear_cache();
    access.school_features(None).await.unwrap();
    assert_eq!(service.fetch_count(), 2);
}

#[tokio::test]
async fn test_failure_fallback_matrix() {
    let failing = MockFeatureService::new();
    failing.set_failing(true);

    let super_admin = access_with(&failing, CurrentUser::with_school(Role::SuperAdmin, "S1"));
    assert!(
        super_admin.has_feature(Feature::Attendance, None).await,
        "super admin fails open"
    );

    for role in [
        Role::SchoolAdmin,
        Role::Teacher,
        Role::Accountant,
        Role::Parent,
        Role::Student,
    ] {
        let access = access_with(&failing, CurrentUser::with_school(role, "S1"));
        assert!(
            !access.has_feature(Feature::Attendance, None).await,
            "{role} fails closed"
        );
    }
}

#[tokio::test]
async fn test_school_features_propagates_transport_errors() {
    let failing = MockFeatureService::new();
    failing.set_failing(true);
    let access = access_with(&failing, CurrentUser::with_school(Role::Teacher, "S1"));

    let err = access.school_features(None).await.unwrap_err();
    assert!(err.is_transport());
}
