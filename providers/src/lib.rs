//! Remote collaborators for Courier.
//!
//! # Architecture
//!
//! The engine never talks to the network directly. It drives two capabilities:
//!
//! - [`StatusClient`] - two independent status sources answering with an
//!   [`Outcome`] per call
//! - [`DeliveryClient`] - an event source plus a send operation answering
//!   with a [`DeliveryResult`] per call
//!
//! Retrying, deadlines and concurrency live in `courier-engine`; an
//! implementation of these traits performs exactly one remote call per
//! invocation.
//!
//! [`http`] provides reqwest-backed implementations, with the
//! `Retry-After` handling in [`retry`].
//!
//! # Error Handling
//!
//! Status queries return `Err(ClientError)` for transport and decoding
//! problems; the engine treats those like a definitive failure. Delivery sends
//! are infallible at the type level: an adapter must classify every problem as
//! [`DeliveryResult::Rejected`] so the fan-out loop keeps retrying.

pub mod http;
pub mod retry;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use courier_types;
use courier_types::{Address, ApplicationId, DeliveryResult, Event, Outcome, Payload};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 32;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

/// Which of the two status sources a query goes to.
///
/// The order of the variants is the race tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Primary,
    Secondary,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Primary, Source::Secondary];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Source::Primary => "primary",
            Source::Secondary => "secondary",
        }
    }

    /// Issue one query against this source.
    pub fn query<'a, C: StatusClient>(
        self,
        client: &'a C,
        id: &'a ApplicationId,
    ) -> impl Future<Output = Result<Outcome, ClientError>> + Send + 'a {
        async move {
            match self {
                Source::Primary => client.primary_status(id).await,
                Source::Secondary => client.secondary_status(id).await,
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two independent sources of application status.
///
/// Each method performs exactly one remote call.
pub trait StatusClient: Send + Sync + 'static {
    fn primary_status(
        &self,
        id: &ApplicationId,
    ) -> impl Future<Output = Result<Outcome, ClientError>> + Send;

    fn secondary_status(
        &self,
        id: &ApplicationId,
    ) -> impl Future<Output = Result<Outcome, ClientError>> + Send;
}

/// Event source and delivery endpoint for broadcasts.
pub trait DeliveryClient: Send + Sync + 'static {
    /// Read the next event to broadcast.
    fn read_data(&self) -> impl Future<Output = Result<Event, ClientError>> + Send;

    /// Deliver `payload` to `dest` once.
    fn send_data(
        &self,
        dest: &Address,
        payload: &Payload,
    ) -> impl Future<Output = DeliveryResult> + Send;
}

/// Shared reqwest client settings for the HTTP adapters.
pub fn http_client() -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .build()
        .map_err(|e| ClientError::Build(e.to_string()))
}
