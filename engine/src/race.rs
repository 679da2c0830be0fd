//! Race dispatcher: the same status request against both sources at once.
//!
//! Each source gets its own bounded leaf, submitted to the worker pool. The
//! dispatcher waits on both completion signals with a single `select!`:
//!
//! - the first leaf to finish with a success wins and is returned at once;
//!   the other leaf is detached and stops at its own deadline
//! - when both leaves fail, their records are merged (primary on the left)
//!
//! A leaf's failure never surfaces as an error. Only a panicking or cancelled
//! leaf does.

use std::sync::Arc;

use courier_providers::{Source, StatusClient};
use courier_types::{ApplicationId, AttemptRecord};
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use crate::{Deadline, DispatchError, execute_with_deadline};

/// How a race ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceResult {
    /// First success. `record` is the winner's own telemetry; the loser's is
    /// discarded.
    Won {
        source: Source,
        record: AttemptRecord,
    },
    /// Neither source succeeded. Retries are summed over both leaves.
    BothFailed(AttemptRecord),
}

impl RaceResult {
    #[must_use]
    pub fn winner(&self) -> Option<Source> {
        match self {
            RaceResult::Won { source, .. } => Some(*source),
            RaceResult::BothFailed(_) => None,
        }
    }

    #[must_use]
    pub fn into_record(self) -> AttemptRecord {
        match self {
            RaceResult::Won { record, .. } | RaceResult::BothFailed(record) => record,
        }
    }
}

pub struct RaceDispatcher<C> {
    client: Arc<C>,
    runtime: Handle,
}

impl<C: StatusClient> RaceDispatcher<C> {
    /// Leaves are spawned onto `runtime`.
    pub fn new(client: Arc<C>, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    /// Race both sources for `id`. No new call is started after `deadline`.
    pub async fn race(
        &self,
        id: &ApplicationId,
        deadline: Deadline,
    ) -> Result<RaceResult, DispatchError> {
        let [mut primary, mut secondary] =
            Source::ALL.map(|source| self.spawn_leaf(source, id, deadline));

        // Biased: when both leaves are ready in the same poll, primary wins.
        let (first_source, joined) = tokio::select! {
            biased;
            joined = &mut primary => (Source::Primary, joined),
            joined = &mut secondary => (Source::Secondary, joined),
        };
        let first = leaf_record(first_source, joined)?;
        if first.is_success() {
            tracing::debug!(source = %first_source, retries = first.retries(), "Race won");
            return Ok(RaceResult::Won {
                source: first_source,
                record: first,
            });
        }

        let (other_source, joined) = match first_source {
            Source::Primary => (Source::Secondary, secondary.await),
            Source::Secondary => (Source::Primary, primary.await),
        };
        let other = leaf_record(other_source, joined)?;
        if other.is_success() {
            tracing::debug!(source = %other_source, retries = other.retries(), "Race won");
            return Ok(RaceResult::Won {
                source: other_source,
                record: other,
            });
        }

        let (primary_record, secondary_record) = match first_source {
            Source::Primary => (first, other),
            Source::Secondary => (other, first),
        };
        let merged = primary_record.merge(secondary_record);
        tracing::debug!(retries = merged.retries(), "Both status sources failed");
        Ok(RaceResult::BothFailed(merged))
    }

    fn spawn_leaf(
        &self,
        source: Source,
        id: &ApplicationId,
        deadline: Deadline,
    ) -> JoinHandle<AttemptRecord> {
        let client = Arc::clone(&self.client);
        let id = id.clone();
        let span = tracing::debug_span!("status_leaf", source = %source, id = %id);
        let leaf = async move {
            execute_with_deadline(|| source.query(&*client, &id), deadline).await
        };
        self.runtime.spawn(leaf.instrument(span))
    }
}

fn leaf_record(
    source: Source,
    joined: Result<AttemptRecord, JoinError>,
) -> Result<AttemptRecord, DispatchError> {
    joined.map_err(|e| DispatchError::from_join(source.as_str(), e))
}
