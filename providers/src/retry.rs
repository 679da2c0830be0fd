//! Server retry signals.
//!
//! A status endpoint asks to be queried again later by answering
//! `429 Too Many Requests` or `503 Service Unavailable`. The delay comes from
//! the response headers:
//!
//! - `Retry-After-Ms`: milliseconds, float (checked first)
//! - `Retry-After`: seconds, integer
//!
//! Long delays are honored as sent; the caller's deadline bounds the wait.
//!
//! `x-should-retry: false` turns a retry signal into a definitive failure and
//! `x-should-retry: true` turns any non-success status into a retry signal.

use std::time::Duration;

use reqwest::{StatusCode, header::HeaderMap};

/// Delay used when a retry signal carries no usable `Retry-After` header.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Parse `Retry-After` or `Retry-After-Ms` headers.
///
/// Returns `Some(duration)` for a positive value. A millisecond value too
/// large for a [`Duration`] saturates at [`Duration::MAX`].
/// Returns `None` if headers are missing, invalid, or zero.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(val) = headers.get("retry-after-ms")
        && let Ok(s) = val.to_str()
        && let Ok(ms) = s.trim().parse::<f64>()
        && ms > 0.0
    {
        return Some(Duration::try_from_secs_f64(ms / 1000.0).unwrap_or(Duration::MAX));
    }

    if let Some(val) = headers.get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.trim().parse::<u64>()
        && secs > 0
    {
        return Some(Duration::from_secs(secs));
    }

    None
}

/// Decide whether a non-success response is a retry signal, and for how long.
///
/// Returns `None` for a definitive failure.
#[must_use]
pub fn retry_delay(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if let Some(val) = headers.get("x-should-retry")
        && let Ok(s) = val.to_str()
    {
        if s.eq_ignore_ascii_case("false") {
            return None;
        }
        if s.eq_ignore_ascii_case("true") {
            return Some(parse_retry_after(headers).unwrap_or(DEFAULT_RETRY_DELAY));
        }
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            Some(parse_retry_after(headers).unwrap_or(DEFAULT_RETRY_DELAY))
        }
        _ => None,
    }
}
