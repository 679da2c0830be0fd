//! Resilient request execution for Courier.
//!
//! # Architecture
//!
//! ```text
//! StatusHandler ──► RaceDispatcher ──┬─► leaf(primary)   ─┐
//!                                    └─► leaf(secondary) ─┴─► first success | merge
//!
//! BroadcastHandler ─► FanoutDispatcher ─► leaf(recipient) × N ─► all accepted
//! ```
//!
//! Handlers block the calling thread; everything below them runs on one
//! fixed-size [`WorkerPool`]. A leaf owns its own state and issues its calls
//! strictly one after another; leaves run fully concurrently with each other.
//!
//! - [`execute_with_deadline`]: bounded leaf, follows `RetryAfter` signals until
//!   a terminal outcome or the [`Deadline`]
//! - [`send_until_accepted`]: unbounded leaf with a fixed resend delay
//! - [`RaceDispatcher`]: two bounded leaves, first success wins
//! - [`FanoutDispatcher`]: one unbounded leaf per recipient, all must accept
//!
//! # Errors
//!
//! Leaf failures end up in an [`AttemptRecord`](courier_types::AttemptRecord)
//! and never as `Err`. [`DispatchError`] is reserved for broken collaborators
//! (a panicking leaf), an exhausted delivery budget, and event-source failures.

#![allow(clippy::missing_errors_doc)]

mod deadline;
mod error;
mod fanout;
mod handler;
mod leaf;
mod pool;
mod race;

#[cfg(test)]
mod testing;

pub use deadline::Deadline;
pub use error::DispatchError;
pub use fanout::{BroadcastSummary, FanoutDispatcher};
pub use handler::{BroadcastHandler, FanoutSettings, RaceSettings, StatusHandler};
pub use leaf::{DeliveryOutcome, execute_with_deadline, send_until_accepted};
pub use pool::WorkerPool;
pub use race::{RaceDispatcher, RaceResult};

pub use courier_providers;
pub use courier_types;
