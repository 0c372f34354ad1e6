//! # Global manager configuration.
//!
//! [`ManagerConfig`] defines the manager's tunables: the per-subscriber
//! event queue capacity and the quiet window used by the uniqueness
//! arbiter's debounce gate.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use runvisor::ManagerConfig;
//!
//! let mut cfg = ManagerConfig::default();
//! cfg.unique_debounce = Duration::from_secs(2);
//!
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use std::time::Duration;

/// Configuration for the manager runtime.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Capacity of each event subscriber's queue.
    pub bus_capacity: usize,
    /// Quiet window of the uniqueness arbiter's debounce gate.
    ///
    /// An incumbent's shutdown typically emits several transitional registry
    /// events; the arbiter re-queries the registry only once the stream has
    /// been quiet for this long.
    pub unique_debounce: Duration,
}

impl Default for ManagerConfig {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `unique_debounce = 5s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            unique_debounce: Duration::from_secs(5),
        }
    }
}
