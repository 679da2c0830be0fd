use courier_providers::ClientError;
use courier_types::Address;
use thiserror::Error;
use tokio::task::JoinError;

/// Failures that escape a dispatcher.
///
/// Definitive failures, timeouts and transport errors of a status query never
/// show up here: they end a leaf with a failure record instead. What remains
/// are contract violations of a collaborator and problems outside the leaves.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("worker pool needs at least one thread")]
    EmptyPool,
    #[error("failed to start worker pool: {0}")]
    PoolStart(#[source] std::io::Error),
    /// A collaborator panicked inside a leaf. Never retried.
    #[error("{leaf} leaf panicked: {message}")]
    LeafPanicked { leaf: String, message: String },
    /// The pool shut down while the leaf was still running.
    #[error("{leaf} leaf was cancelled before reaching a terminal state")]
    LeafCancelled { leaf: String },
    /// Only possible when a delivery attempt budget is configured.
    #[error("delivery to {recipient} was rejected {attempts} times; giving up")]
    DeliveryExhausted { recipient: Address, attempts: u32 },
    #[error("failed to read event: {0}")]
    EventSource(#[from] ClientError),
}

impl DispatchError {
    pub(crate) fn from_join(leaf: impl Into<String>, err: JoinError) -> Self {
        let leaf = leaf.into();
        if !err.is_panic() {
            return DispatchError::LeafCancelled { leaf };
        }
        let payload = err.into_panic();
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        DispatchError::LeafPanicked { leaf, message }
    }
}
