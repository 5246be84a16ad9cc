use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Metrics that should be collected and processed by the harness.
/// Metrics can be composed of other metrics as well.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone + 'static,
{
}

/// What the wire said for one attempt: a real HTTP status, or a marker for a
/// transport-level failure (timeout, connection reset, malformed response).
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Debug, Clone, Copy)]
pub enum AttemptStatus {
    Http(u16),
    Transport,
}

/// One simulated purchase try. Recorded by a virtual client at the moment the
/// request completes and immutable from then on; ownership moves to the
/// aggregator over the metrics channel.
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Debug, Clone)]
pub struct Attempt {
    /// Index of the virtual client that issued the attempt.
    pub client: usize,
    pub status: AttemptStatus,
    pub latency: Duration,
}

impl Metric for Attempt {}

/// Classification of an [`Attempt`]. Derived, never stored: feeding the same
/// attempt through [`Attempt::outcome`] always yields the same answer.
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Eq, Debug, Clone, Copy)]
pub enum Outcome {
    /// The backend accepted the purchase (HTTP 202).
    Accepted,
    /// The backend rejected it as a business rule, e.g. insufficient stock
    /// (HTTP 400).
    Rejected,
    /// Anything else: unexpected status or transport failure. Counted, never
    /// dropped.
    Error,
}

impl Attempt {
    pub fn outcome(&self) -> Outcome {
        match self.status {
            AttemptStatus::Http(202) => Outcome::Accepted,
            AttemptStatus::Http(400) => Outcome::Rejected,
            AttemptStatus::Http(_) | AttemptStatus::Transport => Outcome::Error,
        }
    }
}
