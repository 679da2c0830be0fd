//! Result of a single status query.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ApplicationId, ApplicationStatus};

/// Success payload of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
}

impl StatusReport {
    #[must_use]
    pub fn new(id: ApplicationId, status: ApplicationStatus) -> Self {
        Self { id, status }
    }
}

/// Outcome of one remote status call.
///
/// This is a closed sum type: a status source cannot report anything the
/// retrying leaf does not handle, and adding a variant is a compile error at
/// every match site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Definitive answer.
    Success(StatusReport),
    /// Definitive refusal. Not retried.
    Failure,
    /// The source asks to be queried again after the given delay.
    RetryAfter(Duration),
}
