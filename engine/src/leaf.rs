//! Retrying leaves: one logical request, retried until it reaches a terminal state.
//!
//! # Bounded leaf ([`execute_with_deadline`])
//!
//! ```text
//! loop:
//!   attempt_start = now
//!   deadline passed?           -> failure record (no call)
//!   wait `delay`, then call    (both bounded by the deadline)
//!     Success                  -> success record
//!     Failure                  -> failure record
//!     RetryAfter(d)            -> delay = d, loop
//!     transport error/timeout  -> failure record
//! ```
//!
//! `retries` counts the calls actually issued. A deadline that fires during the
//! backoff wait ends the leaf without counting a call.
//!
//! # Unbounded leaf ([`send_until_accepted`])
//!
//! Sends until accepted, pausing a fixed delay after every rejection. With no
//! attempt budget it never gives up.

use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use courier_providers::ClientError;
use courier_types::{AttemptRecord, DeliveryResult, Outcome};
use tokio::time::Instant;

use crate::Deadline;

/// Run one status request until it succeeds, fails, or runs out of time.
///
/// `call` performs exactly one remote call per invocation. Calls are strictly
/// sequential.
pub async fn execute_with_deadline<F, Fut>(mut call: F, deadline: Deadline) -> AttemptRecord
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Outcome, ClientError>>,
{
    let mut retries: u32 = 0;
    let mut delay = Duration::ZERO;

    loop {
        let attempt_start = Instant::now();
        let failed = |retries: u32| {
            AttemptRecord::failed(retries, attempt_start.into_std(), attempt_start.elapsed())
        };

        if deadline.remaining_at(attempt_start).is_zero() {
            tracing::debug!(retries, "Deadline passed before the next call");
            return failed(retries);
        }

        let attempt = async {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            retries += 1;
            call().await
        };

        match tokio::time::timeout_at(deadline.instant(), attempt).await {
            Ok(Ok(Outcome::Success(report))) => {
                return AttemptRecord::succeeded(
                    report,
                    retries,
                    attempt_start.into_std(),
                    attempt_start.elapsed(),
                );
            }
            Ok(Ok(Outcome::Failure)) => return failed(retries),
            Ok(Ok(Outcome::RetryAfter(next))) => {
                tracing::debug!(
                    retries,
                    delay_ms = next.as_millis(),
                    "Retry requested by status source"
                );
                delay = next;
            }
            Ok(Err(e)) => {
                tracing::warn!(retries, error = %e, "Status call failed");
                return failed(retries);
            }
            Err(_) => {
                tracing::warn!(retries, "Status call timed out at deadline");
                return failed(retries);
            }
        }
    }
}

/// Terminal state of an unbounded delivery leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted { attempts: u32 },
    /// The attempt budget ran out; never produced without one.
    Exhausted { attempts: u32 },
}

impl DeliveryOutcome {
    #[must_use]
    pub const fn attempts(self) -> u32 {
        match self {
            DeliveryOutcome::Accepted { attempts } | DeliveryOutcome::Exhausted { attempts } => {
                attempts
            }
        }
    }
}

/// Send until the recipient accepts, waiting `retry_delay` after every rejection.
///
/// `max_attempts = None` retries forever.
pub async fn send_until_accepted<F, Fut>(
    mut send: F,
    retry_delay: Duration,
    max_attempts: Option<NonZeroU32>,
) -> DeliveryOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DeliveryResult>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        match send().await {
            DeliveryResult::Accepted => return DeliveryOutcome::Accepted { attempts },
            DeliveryResult::Rejected => {
                if let Some(max) = max_attempts
                    && attempts >= max.get()
                {
                    return DeliveryOutcome::Exhausted { attempts };
                }
                tracing::debug!(
                    attempts,
                    delay_ms = retry_delay.as_millis(),
                    "Delivery rejected; resending after delay"
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}
