//! Terminal telemetry of a retrying status request.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::{ApplicationId, ApplicationStatus, StatusReport};

/// What one retrying leaf observed by the time it reached a terminal state.
///
/// `retries` counts every remote call that was issued, including the terminal
/// one. The timing fields describe the most recent attempt only, never the
/// cumulative time spent in the leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    success: Option<StatusReport>,
    retries: u32,
    last_attempt_start: Instant,
    last_attempt_duration: Duration,
}

impl AttemptRecord {
    #[must_use]
    pub fn succeeded(
        report: StatusReport,
        retries: u32,
        last_attempt_start: Instant,
        last_attempt_duration: Duration,
    ) -> Self {
        Self {
            success: Some(report),
            retries,
            last_attempt_start,
            last_attempt_duration,
        }
    }

    #[must_use]
    pub fn failed(retries: u32, last_attempt_start: Instant, last_attempt_duration: Duration) -> Self {
        Self {
            success: None,
            retries,
            last_attempt_start,
            last_attempt_duration,
        }
    }

    #[must_use]
    pub fn success(&self) -> Option<&StatusReport> {
        self.success.as_ref()
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success.is_some()
    }

    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    #[must_use]
    pub const fn last_attempt_start(&self) -> Instant {
        self.last_attempt_start
    }

    #[must_use]
    pub const fn last_attempt_duration(&self) -> Duration {
        self.last_attempt_duration
    }

    /// Combine the telemetry of two leaves that raced for the same request.
    ///
    /// - success: the first present one, `self` first
    /// - retries: the sum of both sides
    /// - timing: taken from whichever side started its last attempt later;
    ///   `self` keeps it on a tie
    #[must_use]
    pub fn merge(self, other: AttemptRecord) -> AttemptRecord {
        let retries = self.retries.saturating_add(other.retries);
        let (last_attempt_start, last_attempt_duration) =
            if self.last_attempt_start < other.last_attempt_start {
                (other.last_attempt_start, other.last_attempt_duration)
            } else {
                (self.last_attempt_start, self.last_attempt_duration)
            };
        AttemptRecord {
            success: self.success.or(other.success),
            retries,
            last_attempt_start,
            last_attempt_duration,
        }
    }

    /// Convert into the caller-facing response.
    #[must_use]
    pub fn into_response(self) -> ApplicationStatusResponse {
        match self.success {
            Some(report) => ApplicationStatusResponse::Success {
                id: report.id,
                status: report.status,
            },
            None => ApplicationStatusResponse::Failure {
                last_request_time: self.last_attempt_duration,
                retries_count: self.retries,
            },
        }
    }
}

/// Public answer of a status operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ApplicationStatusResponse {
    Success {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    Failure {
        /// Duration of the most recent remote call.
        #[serde(with = "millis")]
        last_request_time: Duration,
        /// Total number of remote calls made.
        retries_count: u32,
    },
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}
