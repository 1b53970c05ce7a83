//! Current-user context.
//!
//! The query layer never owns the signed-in user; it reads the role and
//! school through the [`CurrentUserProvider`] capability, so the same core
//! works whether the host keeps its session in memory, on disk, or behind
//! a token store.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

/// Platform role of the signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator role with an unconditional access bypass.
    SuperAdmin,
    SchoolAdmin,
    Teacher,
    Accountant,
    Parent,
    Student,
}

impl Role {
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::SchoolAdmin => "school_admin",
            Self::Teacher => "teacher",
            Self::Accountant => "accountant",
            Self::Parent => "parent",
            Self::Student => "student",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user as far as feature access is concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub role: Role,
    #[serde(default)]
    pub school_id: Option<String>,
}

impl CurrentUser {
    /// A user with no school context (typical for super admins).
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            school_id: None,
        }
    }

    /// A user scoped to a school.
    #[must_use]
    pub fn with_school(role: Role, school_id: impl Into<String>) -> Self {
        Self {
            role,
            school_id: Some(school_id.into()),
        }
    }
}

/// Capability for reading the current session user.
///
/// Reads must be cheap and synchronous; the query layer calls this on
/// every access check.
pub trait CurrentUserProvider: Send + Sync {
    /// The signed-in user, or `None` when no session is active.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// Provider with a fixed user, for CLIs, tests, and single-user tools.
#[derive(Debug, Clone)]
pub struct StaticUserProvider {
    user: Option<CurrentUser>,
}

impl StaticUserProvider {
    #[must_use]
    pub fn new(user: CurrentUser) -> Self {
        Self { user: Some(user) }
    }

    /// A provider with no session at all.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { user: None }
    }
}

impl CurrentUserProvider for StaticUserProvider {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user.clone()
    }
}

/// Shared mutable session slot for hosts with login/logout flows.
///
/// Clones share the same slot, so the handle given to the query layer
/// observes later `sign_in`/`sign_out` calls.
#[derive(Debug, Clone, Default)]
pub struct SharedUserProvider {
    inner: Arc<RwLock<Option<CurrentUser>>>,
}

impl SharedUserProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session user.
    pub fn sign_in(&self, user: CurrentUser) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = Some(user);
        }
    }

    /// Clear the session.
    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.inner.write() {
            *slot = None;
        }
    }
}

impl CurrentUserProvider for SharedUserProvider {
    fn current_user(&self) -> Option<CurrentUser> {
        self.inner.read().map(|slot| slot.clone()).unwrap_or(None)
    }
}
