//! Absolute deadlines on the tokio clock.

use std::time::Duration;

use tokio::time::Instant;

/// Point in time after which no new remote call may be started.
///
/// Built on [`tokio::time::Instant`] so that paused-clock tests observe the
/// same time as the leaves they drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deadline(Instant);

impl Deadline {
    /// `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    #[must_use]
    pub const fn instant(self) -> Instant {
        self.0
    }

    /// Move the deadline `margin` earlier.
    #[must_use]
    pub fn shortened_by(self, margin: Duration) -> Self {
        Self(self.0.checked_sub(margin).unwrap_or(self.0))
    }

    /// Time left as seen at `now`; zero once the deadline has passed.
    #[must_use]
    pub fn remaining_at(self, now: Instant) -> Duration {
        self.0.saturating_duration_since(now)
    }
}
