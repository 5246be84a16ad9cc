//! Executor — orchestration of runtime execution.
//!
//! The `Executor` trait is the runtime hook that executes a `Scenario`.
//! Different executors provide different execution strategies; the harness
//! ships [`StormExecutor`], a constant-population executor purpose-built for
//! forcing contention on a scarce resource: a fixed fleet of virtual clients
//! all hammering the same action inside a narrow wall-clock window.
//!
//! Executors own all concurrency: how clients are scheduled, how their
//! metrics are handed off, and when the run is considered drained. The
//! action's only job is to issue one attempt and describe what happened.

pub mod storm;
pub use storm::StormExecutor;

use std::future::Future;

use crate::{aggregate::Aggregate, scenario::Scenario};

pub trait Executor<A, F, Fut>
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn(usize) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    type Error;

    /// Execute the scenario and return the final aggregate.
    fn exec(
        &self,
        scenario: &Scenario<A, Self, F, Fut>,
    ) -> impl Future<Output = Result<A, Self::Error>> + Send;
}
