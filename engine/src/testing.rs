//! Scripted collaborators for dispatcher tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use courier_providers::{ClientError, DeliveryClient, Source, StatusClient};
use courier_types::{
    Address, ApplicationId, ApplicationStatus, DeliveryResult, Event, Outcome, Payload,
    StatusReport,
};
use tokio::time::Instant;

pub(crate) fn report(id: &str, status: &str) -> StatusReport {
    StatusReport::new(
        ApplicationId::new(id).unwrap(),
        ApplicationStatus::new(status).unwrap(),
    )
}

/// One scripted answer of a status source.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Answer { latency: Duration, outcome: Outcome },
    Error,
    Hang,
    Panic,
}

impl Step {
    pub(crate) fn now(outcome: Outcome) -> Self {
        Step::after(Duration::ZERO, outcome)
    }

    pub(crate) fn after(latency: Duration, outcome: Outcome) -> Self {
        Step::Answer { latency, outcome }
    }

    pub(crate) fn error() -> Self {
        Step::Error
    }

    pub(crate) fn hang() -> Self {
        Step::Hang
    }

    pub(crate) fn panic() -> Self {
        Step::Panic
    }

    pub(crate) async fn run(self) -> Result<Outcome, ClientError> {
        match self {
            Step::Answer { latency, outcome } => {
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                Ok(outcome)
            }
            Step::Error => Err(ClientError::Transport {
                url: "http://scripted".to_string(),
                message: "connection reset".to_string(),
            }),
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("scripted status source panicked"),
        }
    }
}

/// Status sources answering from per-source scripts. An exhausted script
/// answers `Failure`.
#[derive(Debug, Default)]
pub(crate) struct ScriptedStatus {
    primary: Mutex<VecDeque<Step>>,
    secondary: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(Source, Instant)>>,
}

impl ScriptedStatus {
    pub(crate) fn new(primary: Vec<Step>, secondary: Vec<Step>) -> Self {
        Self {
            primary: Mutex::new(primary.into()),
            secondary: Mutex::new(secondary.into()),
            calls: Mutex::default(),
        }
    }

    pub(crate) fn calls(&self, source: Source) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == source)
            .map(|(_, at)| *at)
            .collect()
    }

    fn next(&self, source: Source) -> Step {
        self.calls.lock().unwrap().push((source, Instant::now()));
        let script = match source {
            Source::Primary => &self.primary,
            Source::Secondary => &self.secondary,
        };
        script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::now(Outcome::Failure))
    }
}

impl StatusClient for ScriptedStatus {
    async fn primary_status(&self, _id: &ApplicationId) -> Result<Outcome, ClientError> {
        self.next(Source::Primary).run().await
    }

    async fn secondary_status(&self, _id: &ApplicationId) -> Result<Outcome, ClientError> {
        self.next(Source::Secondary).run().await
    }
}

/// Delivery endpoint answering from per-recipient scripts. An exhausted
/// script answers `Accepted`.
#[derive(Debug)]
pub(crate) struct ScriptedDelivery {
    event: Result<Event, ClientError>,
    scripts: Mutex<HashMap<Address, VecDeque<DeliveryResult>>>,
    latency: HashMap<Address, Duration>,
    panicking: HashSet<Address>,
    exhausted: DeliveryResult,
    sends: Mutex<Vec<(Address, Instant)>>,
}

impl ScriptedDelivery {
    pub(crate) fn new(event: Event) -> Self {
        Self::with_source(Ok(event))
    }

    pub(crate) fn with_source(event: Result<Event, ClientError>) -> Self {
        Self {
            event,
            scripts: Mutex::default(),
            latency: HashMap::new(),
            panicking: HashSet::new(),
            exhausted: DeliveryResult::Accepted,
            sends: Mutex::default(),
        }
    }

    pub(crate) fn script(self, recipient: &Address, results: Vec<DeliveryResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(recipient.clone(), results.into());
        self
    }

    pub(crate) fn latency(mut self, recipient: &Address, latency: Duration) -> Self {
        self.latency.insert(recipient.clone(), latency);
        self
    }

    /// Sends to `recipient` panic.
    pub(crate) fn panics(mut self, recipient: &Address) -> Self {
        self.panicking.insert(recipient.clone());
        self
    }

    /// Answer for recipients whose script ran out.
    pub(crate) fn otherwise(mut self, result: DeliveryResult) -> Self {
        self.exhausted = result;
        self
    }

    pub(crate) fn sends_to(&self, recipient: &Address) -> Vec<Instant> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == recipient)
            .map(|(_, at)| *at)
            .collect()
    }

    pub(crate) fn total_sends(&self) -> usize {
        self.sends.lock().unwrap().len()
    }
}

impl DeliveryClient for ScriptedDelivery {
    async fn read_data(&self) -> Result<Event, ClientError> {
        self.event.clone()
    }

    async fn send_data(&self, dest: &Address, _payload: &Payload) -> DeliveryResult {
        self.sends.lock().unwrap().push((dest.clone(), Instant::now()));
        if self.panicking.contains(dest) {
            panic!("scripted delivery channel panicked");
        }
        let result = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(dest)
            .and_then(VecDeque::pop_front)
            .unwrap_or(self.exhausted);
        if let Some(latency) = self.latency.get(dest) {
            tokio::time::sleep(*latency).await;
        }
        result
    }
}

pub(crate) fn event(recipients: &[Address]) -> Event {
    Event {
        recipients: recipients.to_vec(),
        payload: Payload::new("hub", b"payload".to_vec()),
    }
}
