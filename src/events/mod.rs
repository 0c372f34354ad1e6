//! # Lifecycle events published by the manager.
//!
//! Every operator-visible decision the manager takes (starting a server,
//! deferring a unique service, acting on a broker command) is published as
//! an [`Event`] on the [`Bus`]. Subscribers consume the stream through the
//! [`subscribers`](crate::subscribers) module.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Manager ── publish(Event) ──► Bus
//!                                  │ (bounded queue per subscriber)
//!                                  ├──► worker ──► LogWriter
//!                                  └──► worker ──► custom Subscribe impls
//! ```

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
