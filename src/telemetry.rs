//! Usage telemetry
//!
//! Fire-and-forget event recording. Events are counted in memory and logged;
//! nothing leaves the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Event recorded once per connection factory call
pub const CONNECTION_EVENT: &str = "connection";

/// Telemetry hook
#[cfg_attr(test, mockall::automock)]
pub trait Telemetry: Send + Sync {
    /// Record that `event` happened
    fn record(&self, event: &str);
}

/// In-memory usage counters
#[derive(Debug, Default)]
pub struct UsageStats {
    enabled: bool,
    counts: Mutex<HashMap<String, u64>>,
}

impl UsageStats {
    /// Create usage stats, recording only when `enabled`
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Number of times `event` was recorded
    pub fn count(&self, event: &str) -> u64 {
        self.counts().get(event).copied().unwrap_or(0)
    }

    /// Snapshot of all counters
    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counts().clone()
    }

    // A poisoned lock still holds valid counts
    fn counts(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Telemetry for UsageStats {
    fn record(&self, event: &str) {
        if !self.enabled {
            return;
        }

        tracing::debug!("Telemetry event: {}", event);
        *self.counts().entry(event.to_string()).or_insert(0) += 1;
    }
}
