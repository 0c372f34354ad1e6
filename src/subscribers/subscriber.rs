//! # Lifecycle event subscriber.
//!
//! [`Subscribe`] is the extension point for reacting to the manager's
//! lifecycle decisions: shipping them to an operator log, a metrics
//! exporter, or an alerting hook. The [`Bus`](crate::events::Bus) drives
//! each subscriber from its own bounded queue, so a slow one never holds
//! up a lifecycle decision.

use async_trait::async_trait;

use crate::events::Event;

/// Consumer of manager lifecycle events.
///
/// Events arrive in publish order for this subscriber, one at a time, on
/// a dedicated worker task. Handle errors internally; a panic kills only
/// this subscriber's worker, and later events are dropped for it.
///
/// ## Example
/// ```
/// use async_trait::async_trait;
/// use runvisor::{Event, EventKind, Subscribe};
///
/// struct Alerts;
///
/// #[async_trait]
/// impl Subscribe for Alerts {
///     async fn on_event(&self, event: &Event) {
///         if event.kind == EventKind::ServeFailed {
///             // page someone
///         }
///     }
///
///     fn name(&self) -> &'static str {
///         "alerts"
///     }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Short name used when reporting events this subscriber missed.
    fn name(&self) -> &'static str;
}
