use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default grace period before a replayed pending action navigates.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Default storage key of the pending-action slot.
pub const DEFAULT_PENDING_KEY: &str = "pending_navigation_action";

/// Tunables of the navigation core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Delay between a replay being requested and the navigation it performs,
    /// so a freshly mounted screen can finish its first layout pass.
    pub settle_delay_ms: u64,
    /// Key of the single pending-action slot in the key-value store.
    pub pending_key: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            pending_key: DEFAULT_PENDING_KEY.to_string(),
        }
    }
}

impl NavigationConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
