//! Fan-out dispatcher: one payload, every recipient must accept it.
//!
//! Each recipient gets its own unbounded leaf on the worker pool. The
//! dispatcher waits for all of them; there is no early exit. Without an
//! attempt budget a recipient that rejects forever blocks the broadcast
//! forever.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use courier_providers::DeliveryClient;
use courier_types::{Address, Event, Payload};
use futures_util::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{DeliveryOutcome, DispatchError, send_until_accepted};

/// What a completed broadcast did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub recipients: usize,
    /// Sends issued across all recipients, accepted ones included.
    pub attempts: u32,
}

pub struct FanoutDispatcher<C> {
    client: Arc<C>,
    runtime: Handle,
    retry_delay: Duration,
    max_attempts: Option<NonZeroU32>,
}

impl<C: DeliveryClient> FanoutDispatcher<C> {
    /// Unbounded dispatcher resending every `retry_delay` after a rejection.
    pub fn new(client: Arc<C>, runtime: Handle, retry_delay: Duration) -> Self {
        Self {
            client,
            runtime,
            retry_delay,
            max_attempts: None,
        }
    }

    /// Cap sends per recipient. `None` restores unbounded retrying.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<NonZeroU32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Read the next event from the client and broadcast it.
    pub async fn read_and_broadcast(&self) -> Result<BroadcastSummary, DispatchError> {
        let event = self.client.read_data().await?;
        self.broadcast(event).await
    }

    /// Deliver `event.payload` to every recipient, returning once all accepted.
    ///
    /// With an attempt budget, a recipient that exhausts it fails the
    /// broadcast after every other leaf has finished.
    pub async fn broadcast(&self, event: Event) -> Result<BroadcastSummary, DispatchError> {
        let Event {
            recipients,
            payload,
        } = event;
        let payload = Arc::new(payload);
        let count = recipients.len();
        tracing::debug!(recipients = count, "Broadcasting event");

        let handles: Vec<JoinHandle<DeliveryOutcome>> = recipients
            .iter()
            .map(|recipient| self.spawn_leaf(recipient.clone(), Arc::clone(&payload)))
            .collect();
        let joined = join_all(handles).await;

        let mut attempts: u32 = 0;
        let mut first_error = None;
        for (recipient, result) in recipients.into_iter().zip(joined) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(DispatchError::from_join(recipient.to_string(), e));
                    }
                    continue;
                }
            };
            attempts = attempts.saturating_add(outcome.attempts());
            if let DeliveryOutcome::Exhausted { attempts: sent } = outcome {
                tracing::warn!(recipient = %recipient, attempts = sent, "Delivery attempts exhausted");
                if first_error.is_none() {
                    first_error = Some(DispatchError::DeliveryExhausted {
                        recipient,
                        attempts: sent,
                    });
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        tracing::info!(recipients = count, attempts, "Broadcast accepted by all recipients");
        Ok(BroadcastSummary {
            recipients: count,
            attempts,
        })
    }

    fn spawn_leaf(&self, recipient: Address, payload: Arc<Payload>) -> JoinHandle<DeliveryOutcome> {
        let client = Arc::clone(&self.client);
        let retry_delay = self.retry_delay;
        let max_attempts = self.max_attempts;
        let span = tracing::debug_span!("delivery_leaf", recipient = %recipient);
        let leaf = async move {
            send_until_accepted(
                || client.send_data(&recipient, &payload),
                retry_delay,
                max_attempts,
            )
            .await
        };
        self.runtime.spawn(leaf.instrument(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedDelivery, event};
    use courier_providers::ClientError;
    use courier_types::DeliveryResult::{Accepted, Rejected};
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(500);

    fn addr(node: &str) -> Address {
        Address::new("dc1", node)
    }

    fn dispatcher(client: ScriptedDelivery) -> (FanoutDispatcher<ScriptedDelivery>, Arc<ScriptedDelivery>) {
        let client = Arc::new(client);
        (
            FanoutDispatcher::new(Arc::clone(&client), Handle::current(), DELAY),
            client,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_recipient_is_resent_with_fixed_delay() {
        let (a, b, c) = (addr("a"), addr("b"), addr("c"));
        let (fanout, client) = dispatcher(
            ScriptedDelivery::new(event(&[a.clone(), b.clone(), c.clone()]))
                .script(&b, vec![Rejected, Rejected, Accepted]),
        );

        let summary = fanout.broadcast(event(&[a.clone(), b.clone(), c.clone()])).await.unwrap();

        assert_eq!(summary, BroadcastSummary { recipients: 3, attempts: 5 });
        assert_eq!(client.sends_to(&a).len(), 1);
        assert_eq!(client.sends_to(&c).len(), 1);
        let sends = client.sends_to(&b);
        assert_eq!(sends.len(), 3);
        for pair in sends.windows(2) {
            assert!(pair[1] - pair[0] >= DELAY);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_slowest_recipient() {
        let (fast, slow) = (addr("fast"), addr("slow"));
        let (fanout, _client) = dispatcher(
            ScriptedDelivery::new(event(&[])).latency(&slow, Duration::from_secs(3)),
        );

        let started = Instant::now();
        let summary = fanout.broadcast(event(&[fast, slow])).await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(summary.attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_by_default() {
        let stubborn = addr("stubborn");
        let mut script = vec![Rejected; 40];
        script.push(Accepted);
        let (fanout, client) =
            dispatcher(ScriptedDelivery::new(event(&[])).script(&stubborn, script));

        let summary = fanout.broadcast(event(&[stubborn.clone()])).await.unwrap();

        assert_eq!(summary.attempts, 41);
        assert_eq!(client.sends_to(&stubborn).len(), 41);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_fails_after_all_leaves_finish() {
        let (ok, bad) = (addr("ok"), addr("bad"));
        let (fanout, client) = dispatcher(
            ScriptedDelivery::new(event(&[]))
                .script(&ok, vec![Rejected, Accepted])
                .otherwise(Rejected),
        );
        let fanout = fanout.with_max_attempts(NonZeroU32::new(3));

        let err = fanout.broadcast(event(&[bad.clone(), ok.clone()])).await.unwrap_err();

        match err {
            DispatchError::DeliveryExhausted {
                recipient,
                attempts,
            } => {
                assert_eq!(recipient, bad);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected DeliveryExhausted, got {other:?}"),
        }
        assert_eq!(client.sends_to(&ok).len(), 2);
        assert_eq!(client.sends_to(&bad).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_recipient_fails_after_others_finish() {
        let (bad, slow) = (addr("bad"), addr("slow"));
        let (fanout, client) = dispatcher(
            ScriptedDelivery::new(event(&[]))
                .panics(&bad)
                .script(&slow, vec![Rejected, Accepted])
                .latency(&slow, Duration::from_secs(2)),
        );

        let started = Instant::now();
        let err = fanout.broadcast(event(&[bad.clone(), slow.clone()])).await.unwrap_err();

        match err {
            DispatchError::LeafPanicked { leaf, message } => {
                assert_eq!(leaf, bad.to_string());
                assert!(message.contains("scripted delivery channel panicked"));
            }
            other => panic!("expected LeafPanicked, got {other:?}"),
        }
        // Two 2s sends plus one resend delay.
        assert_eq!(started.elapsed(), Duration::from_secs(4) + DELAY);
        assert_eq!(client.sends_to(&slow).len(), 2);
        assert_eq!(client.sends_to(&bad).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_recipient_list_completes_immediately() {
        let (fanout, client) = dispatcher(ScriptedDelivery::new(event(&[])));

        let summary = fanout.broadcast(event(&[])).await.unwrap();

        assert_eq!(summary, BroadcastSummary { recipients: 0, attempts: 0 });
        assert_eq!(client.total_sends(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn read_and_broadcast_uses_event_source() {
        let (a, b) = (addr("a"), addr("b"));
        let (fanout, client) = dispatcher(ScriptedDelivery::new(event(&[a.clone(), b.clone()])));

        let summary = fanout.read_and_broadcast().await.unwrap();

        assert_eq!(summary.recipients, 2);
        assert_eq!(client.sends_to(&a).len(), 1);
        assert_eq!(client.sends_to(&b).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn event_source_error_aborts_before_sending() {
        let (fanout, client) = dispatcher(ScriptedDelivery::with_source(Err(ClientError::Status {
            url: "http://hub/events".to_string(),
            status: 503,
        })));

        let err = fanout.read_and_broadcast().await.unwrap_err();

        assert!(matches!(err, DispatchError::EventSource(ClientError::Status { status: 503, .. })));
        assert_eq!(client.total_sends(), 0);
    }
}
