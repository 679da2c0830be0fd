//! Blocking entry points.
//!
//! Callers are plain threads: each operation computes its deadline, hands the
//! dispatcher to the worker pool and blocks until the aggregate result is in.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use courier_config::{BroadcastConfig, StatusConfig};
use courier_providers::{DeliveryClient, StatusClient};
use courier_types::{ApplicationId, ApplicationStatusResponse};

use crate::{BroadcastSummary, Deadline, DispatchError, FanoutDispatcher, RaceDispatcher, WorkerPool};

/// Timing of a status operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceSettings {
    /// Overall budget of one operation.
    pub timeout: Duration,
    /// Part of the budget reserved for turning the result into a response.
    pub safety_margin: Duration,
}

impl RaceSettings {
    pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_millis(100);

    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            safety_margin: Self::DEFAULT_SAFETY_MARGIN,
        }
    }

    #[must_use]
    pub const fn from_config(config: &StatusConfig) -> Self {
        Self {
            timeout: config.timeout(),
            safety_margin: config.safety_margin(),
        }
    }

    /// Deadline for calls of an operation starting now.
    #[must_use]
    pub fn call_deadline(&self) -> Deadline {
        Deadline::after(self.timeout).shortened_by(self.safety_margin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutSettings {
    pub retry_delay: Duration,
    pub max_attempts: Option<NonZeroU32>,
}

impl FanoutSettings {
    #[must_use]
    pub const fn new(retry_delay: Duration) -> Self {
        Self {
            retry_delay,
            max_attempts: None,
        }
    }

    #[must_use]
    pub const fn from_config(config: &BroadcastConfig) -> Self {
        Self {
            retry_delay: config.retry_delay(),
            max_attempts: config.max_attempts(),
        }
    }
}

/// Status lookups raced across both sources.
pub struct StatusHandler<C> {
    pool: Arc<WorkerPool>,
    dispatcher: RaceDispatcher<C>,
    settings: RaceSettings,
}

impl<C: StatusClient> StatusHandler<C> {
    pub fn new(pool: Arc<WorkerPool>, client: Arc<C>, settings: RaceSettings) -> Self {
        let dispatcher = RaceDispatcher::new(client, pool.handle());
        Self {
            pool,
            dispatcher,
            settings,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Look up the status of `id`, blocking the calling thread.
    ///
    /// Failures of the sources are part of the response. `Err` means a
    /// collaborator broke its contract.
    pub fn perform_operation(
        &self,
        id: &ApplicationId,
    ) -> Result<ApplicationStatusResponse, DispatchError> {
        let deadline = self.settings.call_deadline();
        let result = self.pool.block_on(self.dispatcher.race(id, deadline))?;
        Ok(result.into_record().into_response())
    }
}

/// Broadcasts of the next event to all of its recipients.
pub struct BroadcastHandler<C> {
    pool: Arc<WorkerPool>,
    dispatcher: FanoutDispatcher<C>,
}

impl<C: DeliveryClient> BroadcastHandler<C> {
    pub fn new(pool: Arc<WorkerPool>, client: Arc<C>, settings: FanoutSettings) -> Self {
        let dispatcher = FanoutDispatcher::new(client, pool.handle(), settings.retry_delay)
            .with_max_attempts(settings.max_attempts);
        Self { pool, dispatcher }
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.dispatcher.retry_delay()
    }

    /// Read one event and block until every recipient accepted it.
    pub fn perform_operation(&self) -> Result<BroadcastSummary, DispatchError> {
        self.pool.block_on(self.dispatcher.read_and_broadcast())
    }
}
