//! The platform feature catalog.
//!
//! Every capability a subscription plan can switch on or off is one of the
//! identifiers below. The catalog is closed: the backend and this client
//! agree on the full universe at compile time, and an id outside it in a
//! service response is a decode error, not a new feature.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A capability toggle a subscription plan may enable or disable.
///
/// Wire ids are camelCase (`"feeManagement"`, `"smsNotifications"`), as
/// sent by the feature service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    Dashboard,
    Teachers,
    Students,
    Classes,
    Attendance,
    Homework,
    Events,
    Complaints,
    Fees,
    FeeManagement,
    Reports,
    SmsNotifications,
    EmailNotifications,
    MobileApp,
    CustomBranding,
    ApiAccess,
    AdvancedReports,
    BulkImport,
    ParentPortal,
}

impl Feature {
    /// The full catalog, in a fixed order.
    pub const ALL: [Feature; 19] = [
        Feature::Dashboard,
        Feature::Teachers,
        Feature::Students,
        Feature::Classes,
        Feature::Attendance,
        Feature::Homework,
        Feature::Events,
        Feature::Complaints,
        Feature::Fees,
        Feature::FeeManagement,
        Feature::Reports,
        Feature::SmsNotifications,
        Feature::EmailNotifications,
        Feature::MobileApp,
        Feature::CustomBranding,
        Feature::ApiAccess,
        Feature::AdvancedReports,
        Feature::BulkImport,
        Feature::ParentPortal,
    ];

    /// The wire id of this feature.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Teachers => "teachers",
            Self::Students => "students",
            Self::Classes => "classes",
            Self::Attendance => "attendance",
            Self::Homework => "homework",
            Self::Events => "events",
            Self::Complaints => "complaints",
            Self::Fees => "fees",
            Self::FeeManagement => "feeManagement",
            Self::Reports => "reports",
            Self::SmsNotifications => "smsNotifications",
            Self::EmailNotifications => "emailNotifications",
            Self::MobileApp => "mobileApp",
            Self::CustomBranding => "customBranding",
            Self::ApiAccess => "apiAccess",
            Self::AdvancedReports => "advancedReports",
            Self::BulkImport => "bulkImport",
            Self::ParentPortal => "parentPortal",
        }
    }

    /// The human-readable name shown in upgrade prompts and settings.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Teachers => "Teacher Management",
            Self::Students => "Student Management",
            Self::Classes => "Class Management",
            Self::Attendance => "Attendance Tracking",
            Self::Homework => "Homework & Assignments",
            Self::Events => "Events Calendar",
            Self::Complaints => "Complaints & Feedback",
            Self::Fees => "Fee Collection",
            Self::FeeManagement => "Fee Management",
            Self::Reports => "Reports & Analytics",
            Self::SmsNotifications => "SMS Notifications",
            Self::EmailNotifications => "Email Notifications",
            Self::MobileApp => "Mobile App",
            Self::CustomBranding => "Custom Branding",
            Self::ApiAccess => "API Access",
            Self::AdvancedReports => "Advanced Reports",
            Self::BulkImport => "Bulk Import",
            Self::ParentPortal => "Parent Portal",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an id outside the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown feature id: {0}")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}
