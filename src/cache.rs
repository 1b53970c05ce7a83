//! TTL cache for feature bundles.
//!
//! Repeated access checks within a short window must not hammer the
//! feature service, so the last fetched bundle per school is kept for a
//! fixed time-to-live (five minutes by default). The cache is keyed by
//! school id; super admins moving between schools keep each school's
//! bundle warm independently.
//!
//! Time is read through the [`Clock`] trait so tests can expire entries
//! without sleeping.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::bundle::FeatureBundle;

/// How long a cached bundle stays valid.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of monotonic time for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    bundle: FeatureBundle,
    expires_at: Instant,
}

/// Keyed TTL cache of feature bundles, shared by every guard instance and
/// direct caller of the query layer.
pub struct FeatureCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl FeatureCache {
    /// Create a cache with the given TTL and the system clock.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache with an injected clock.
    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Get the cached bundle for a school if one exists and has not
    /// expired. Expiry is a miss, not an error.
    #[must_use]
    pub fn read(&self, school_id: &str) -> Option<FeatureBundle> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            // Poisoned lock: treat as a miss, the caller refetches.
            Err(_) => {
                tracing::warn!(
                    target: "classgate::cache",
                    "Feature cache lock poisoned, treating read as miss"
                );
                return None;
            }
        };

        entries.get(school_id).and_then(|entry| {
            if entry.expires_at > self.clock.now() {
                Some(entry.bundle.clone())
            } else {
                None
            }
        })
    }

    /// Store a bundle for a school, stamping the current time.
    pub fn write(&self, school_id: &str, bundle: FeatureBundle) {
        let expires_at = self.clock.now() + self.ttl;
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(school_id.to_string(), CacheEntry { bundle, expires_at });
            }
            Err(_) => {
                tracing::warn!(
                    target: "classgate::cache",
                    school_id = %school_id,
                    "Feature cache lock poisoned, skipping cache update"
                );
            }
        }
    }

    /// Drop one school's entry so the next read is a guaranteed miss.
    pub fn invalidate(&self, school_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(school_id);
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => {
                tracing::warn!(
                    target: "classgate::cache",
                    "Feature cache lock poisoned, clearing and recovering"
                );
                poisoned.into_inner().clear();
            }
        }
    }

    /// Remove entries past their TTL.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, entry| entry.expires_at > now);
        }
    }

    /// Number of entries currently held, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FeatureCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}
