//! Fan-out delivery types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A delivery recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub datacenter: String,
    pub node_id: String,
}

impl Address {
    #[must_use]
    pub fn new(datacenter: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            datacenter: datacenter.into(),
            node_id: node_id.into(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.datacenter, self.node_id)
    }
}

/// Opaque data delivered to every recipient of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub origin: String,
    pub data: Vec<u8>,
}

impl Payload {
    #[must_use]
    pub fn new(origin: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// One batch to broadcast: a shared payload and its recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub recipients: Vec<Address>,
    pub payload: Payload,
}

/// Answer of a single delivery send.
///
/// Closed: a channel cannot report a third kind of result without every
/// match site failing to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryResult {
    Accepted,
    Rejected,
}
