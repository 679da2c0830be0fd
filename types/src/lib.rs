//! Core domain types for Courier.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.
//!
//! # Overview
//!
//! | Type | Produced by | Consumed by |
//! |------|-------------|-------------|
//! | [`Outcome`] | a single status query | the bounded retrying leaf |
//! | [`AttemptRecord`] | the bounded retrying leaf | the race dispatcher |
//! | [`ApplicationStatusResponse`] | the race handler | callers |
//! | [`DeliveryResult`] | a single delivery send | the unbounded retrying leaf |
//! | [`Event`] | the event source | the fan-out dispatcher |

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod delivery;
mod ids;
mod outcome;
mod record;

pub use delivery::{Address, DeliveryResult, Event, Payload};
pub use ids::{ApplicationId, ApplicationStatus, EmptyIdError};
pub use outcome::{Outcome, StatusReport};
pub use record::{ApplicationStatusResponse, AttemptRecord};
