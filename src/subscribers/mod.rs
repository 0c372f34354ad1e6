//! # Event subscribers for manager observability.
//!
//! [`Subscribe`] implementations react to the manager's lifecycle
//! decisions; the [`Bus`](crate::events::Bus) feeds each one through its
//! own bounded queue and worker task.
//!
//! ## Rules
//! - A slow subscriber only affects itself (its queue fills and drops)
//! - A panicking subscriber loses its worker; the manager continues
//! - Delivery is FIFO per subscriber, with no ordering across subscribers

mod log;
mod subscriber;

pub use log::LogWriter;
pub use subscriber::Subscribe;
