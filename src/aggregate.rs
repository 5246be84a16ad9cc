use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::metric::{Attempt, Metric, Outcome};

/// The `Aggregate` trait defines how raw [`Metric`] values are collected and
/// combined into an intermediate, mergeable representation that preserves the
/// information necessary for later analysis.
///
/// **Important:** `Aggregate` implementations should **not** compute final
/// statistics such as averages or percentiles. Those derived values belong in
/// a `Report`, which is converted from an `Aggregate` and performs the final
/// processing. Aggregates are responsible for storing compact, mergeable raw
/// data (counts, sums, latency samples, error counters) so that the report
/// stage can compute accurate summaries without losing information.
///
/// # Implementor notes
///
/// - Ensure `merge` is **associative** and **commutative** so that merging
///   order does not affect results when combining worker-local aggregates.
///   Virtual clients complete in arbitrary order relative to wall-clock start
///   order; nothing downstream may depend on arrival order.
/// - Do not perform final derivations (like computing percentiles or error
///   ratios) in the aggregate — leave those to the report stage so different
///   reporting formats can derive what they need from the same raw data.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    ///
    /// This default implementation calls [`consume`](Aggregate::consume) for
    /// each metric.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine two different aggregates into one.
    fn merge(&mut self, other: Self);
}

/// Running tally of a checkout storm.
///
/// Tracks one counter per [`Outcome`] bucket, the total number of attempts
/// consumed, and every observed latency sample. Keeping the raw samples (a
/// storm produces at most a few thousand) lets the report answer percentile
/// queries exactly, and concatenation commutes once the report sorts.
///
/// Invariant: `accepted + rejected + errors == count`. Every attempt is
/// classified into exactly one bucket, no attempt is silently dropped.
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Debug, Clone, Default)]
pub struct StormAggregate {
    pub accepted: u64,
    pub rejected: u64,
    pub errors: u64,
    pub count: u64,
    pub latencies: Vec<Duration>,
}

impl Aggregate for StormAggregate {
    type Metric = Attempt;

    fn new() -> Self {
        StormAggregate::default()
    }

    fn consume(&mut self, metric: &Self::Metric) {
        match metric.outcome() {
            Outcome::Accepted => self.accepted += 1,
            Outcome::Rejected => self.rejected += 1,
            Outcome::Error => self.errors += 1,
        }
        self.count += 1;
        self.latencies.push(metric.latency);
    }

    fn merge(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.errors += other.errors;
        self.count += other.count;
        self.latencies.extend(other.latencies);
    }
}
