use std::fmt::{self, Debug};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, StormAggregate};

pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

#[async_trait]
pub trait Reporter<A: Aggregate, R: Report<A>> {
    async fn report(&self, report: R) -> Result<(), Box<dyn std::error::Error>>;
}

/// Pass/fail ceilings evaluated once a storm has drained.
///
/// Both guard the harness itself, not the oversell invariant: a
/// transport-failure-heavy run means harness or network trouble, and a
/// saturated target masks the race signal. Breaching either fails the run.
#[derive(Serialize, Deserialize, PartialOrd, PartialEq, Debug, Clone, Copy)]
pub struct Thresholds {
    /// Ceiling on `errors / count`.
    pub max_error_rate: f64,
    /// Ceiling on the 95th-percentile attempt latency.
    pub p95_limit: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.1,
            p95_limit: Duration::from_secs(5),
        }
    }
}

/// Final summary of one storm run: the outcome counters, the derived error
/// rate and p95 latency, and the thresholds they were judged against.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct StormReport {
    pub accepted: u64,
    pub rejected: u64,
    pub errors: u64,
    pub total: u64,
    pub error_rate: f64,
    pub p95_latency: Duration,
    pub thresholds: Thresholds,
}

impl StormReport {
    pub fn evaluate(aggregate: &StormAggregate, thresholds: &Thresholds) -> Self {
        let error_rate = if aggregate.count == 0 {
            0.0
        } else {
            aggregate.errors as f64 / aggregate.count as f64
        };
        Self {
            accepted: aggregate.accepted,
            rejected: aggregate.rejected,
            errors: aggregate.errors,
            total: aggregate.count,
            error_rate,
            p95_latency: percentile(&aggregate.latencies, 95.0),
            thresholds: *thresholds,
        }
    }

    pub fn error_rate_ok(&self) -> bool {
        self.error_rate < self.thresholds.max_error_rate
    }

    pub fn p95_ok(&self) -> bool {
        self.p95_latency < self.thresholds.p95_limit
    }

    pub fn passed(&self) -> bool {
        self.error_rate_ok() && self.p95_ok()
    }
}

impl From<StormAggregate> for StormReport {
    fn from(value: StormAggregate) -> Self {
        StormReport::evaluate(&value, &Thresholds::default())
    }
}

impl Report<StormAggregate> for StormReport {}

impl fmt::Display for StormReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "checkout storm summary")?;
        writeln!(f, "  attempts  {}", self.total)?;
        writeln!(f, "  accepted  {}", self.accepted)?;
        writeln!(f, "  rejected  {}", self.rejected)?;
        writeln!(
            f,
            "  errors    {} ({:.1}%)",
            self.errors,
            self.error_rate * 100.0
        )?;
        writeln!(f, "  p95       {:?}", self.p95_latency)?;
        writeln!(
            f,
            "  error rate {:.1}% < {:.1}% .. {}",
            self.error_rate * 100.0,
            self.thresholds.max_error_rate * 100.0,
            verdict(self.error_rate_ok())
        )?;
        writeln!(
            f,
            "  p95 {:?} < {:?} .. {}",
            self.p95_latency,
            self.thresholds.p95_limit,
            verdict(self.p95_ok())
        )?;
        write!(f, "  verdict   {}", verdict(self.passed()))
    }
}

fn verdict(ok: bool) -> &'static str {
    if ok { "pass" } else { "FAIL" }
}

/// Nearest-rank percentile over the raw latency samples. Sorting here keeps
/// the estimator independent of the order attempts arrived in.
pub fn percentile(samples: &[Duration], pct: f64) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

pub struct StdoutReporter;

#[async_trait]
impl Reporter<StormAggregate, StormReport> for StdoutReporter {
    async fn report(&self, report: StormReport) -> Result<(), Box<dyn std::error::Error>> {
        println!("{report}");
        Ok(())
    }
}
