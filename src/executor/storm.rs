//! The `StormExecutor`: a constant-population, fixed-window execution model.
//!
//! Unlike a rate-governed executor, a storm does not meter attempts. It
//! spawns a fixed fleet of virtual clients, releases them simultaneously, and
//! lets each one loop (attempt, record, short random pause) until the
//! wall-clock window closes. The point is to concentrate as many concurrent
//! attempts as possible on one scarce resource; any backpressure must come
//! from the target, not from the harness.
//!
//! # High-level flow
//! 1. A bounded mpsc channel is created for the attempt stream, and a
//!    dedicated aggregator task is spawned to drain it. Clients never share
//!    mutable state with one another; the channel is the only hand-off.
//! 2. `population` client tasks are spawned, each parked on a watch channel.
//! 3. The start signal is broadcast, all clients wake at once, and each runs
//!    its attempt loop until the deadline.
//! 4. Clients stop *launching* attempts at the deadline but always let the
//!    attempt in flight complete, so nothing is ever half-recorded.
//! 5. The executor joins every client, which closes the channel; the
//!    aggregator drains what remains and yields the final aggregate.
//!
//! # Notes about correctness & robustness
//! - Clients are symmetric and stateless apart from their index. They never
//!   coordinate: observed contention is attributable entirely to the target.
//! - A failed attempt is data, not an error: the action classifies it and
//!   the client moves on. One client's transport trouble never aborts its
//!   siblings.
//! - The final aggregate is computed only after the client join barrier, so
//!   the run can never finalize with attempts still in flight.
//! - `merge`/`consume` on aggregates must be commutative; attempts arrive in
//!   whatever order the scheduler produces.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{aggregate::Aggregate, error::StormError, metric::Metric, scenario::Scenario};
use internals::*;

/// Buffered channel slots per virtual client. Deep enough that a briefly
/// busy aggregator never stalls a client mid-storm.
const CHANNEL_SLACK: usize = 10;

/// Executor that storms a target with a fixed population of concurrent
/// virtual clients for a fixed wall-clock duration.
///
/// - `population`: number of concurrent clients. The default of 100, paired
///   with a deliberately scarce resource, is what forces the race.
/// - `duration`: the attempt window. A narrow window concentrates the
///   contention; a long soak dilutes it.
/// - `max_jitter`: each client sleeps a uniform-random pause in
///   `[0, max_jitter)` between iterations, de-synchronizing the loop so the
///   target sees a sustained scramble instead of lockstep waves.
#[derive(TypedBuilder)]
pub struct StormExecutor {
    #[builder(default = 100)]
    pub population: usize,
    #[builder(default = Duration::from_secs(1))]
    pub duration: Duration,
    #[builder(default = Duration::from_millis(500))]
    pub max_jitter: Duration,
}

impl<A, F, Fut> Executor<A, F, Fut> for StormExecutor
where
    A: Aggregate + 'static,
    F: Fn(usize) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    type Error = StormError;

    async fn exec(&self, scenario: &Scenario<A, Self, F, Fut>) -> Result<A, StormError> {
        let (metrics_tx, metrics_rx) = mpsc::channel(self.population.max(1) * CHANNEL_SLACK);
        let (start_tx, start_rx) = watch::channel(false);

        tracing::info!("Spawning metrics aggregator...");
        let aggregator = tokio::spawn(aggregator_task::<A>(metrics_rx, self.population.max(1)));

        tracing::info!("Spawning {} virtual clients...", self.population);
        let handles = spawn_clients(
            start_rx,
            metrics_tx,
            self.population,
            self.duration,
            self.max_jitter,
            scenario.action.clone(),
        );

        tracing::info!("Running scenario: {}", scenario.name);
        // A send error only means every client is already gone.
        let _ = start_tx.send(true);

        // Join barrier: every client has let its in-flight attempt complete
        // before this resolves, and joining drops the last channel sender.
        let issued: u64 = join_all(handles)
            .await
            .into_iter()
            .map(|res| match res {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("Virtual client panicked: {e}");
                    0
                }
            })
            .sum();

        tracing::info!("Draining aggregator ({issued} attempts issued)...");
        let aggregate = aggregator.await?;

        tracing::info!("Done running scenario: {}", scenario.name);
        Ok(aggregate)
    }
}

mod internals {
    use super::*;

    /// Aggregation task fed by all virtual clients over the metrics channel.
    /// Drains in batches; exits once every sender has been dropped.
    pub(super) async fn aggregator_task<A: Aggregate>(
        mut rx: mpsc::Receiver<A::Metric>,
        batch_size: usize,
    ) -> A {
        let mut agg = A::new();
        let mut batch = Vec::with_capacity(batch_size);

        loop {
            // Block for the first metric, or end once the channel closes
            match rx.recv().await {
                Some(metric) => batch.push(metric),
                None => break,
            }

            // Opportunistically take whatever else is already queued
            while batch.len() < batch_size {
                match rx.try_recv() {
                    Ok(metric) => batch.push(metric),
                    Err(_) => break,
                }
            }

            agg.aggregate(&batch);
            batch.clear();
        }

        agg
    }

    /// Spawns `population` client tasks. Each waits for the start broadcast,
    /// then loops until the deadline: run the action, ship the attempt,
    /// pause a random jitter. Returns the join handles; each task resolves
    /// to the number of attempts it issued.
    pub(super) fn spawn_clients<M, F, Fut>(
        start: watch::Receiver<bool>,
        metrics: mpsc::Sender<M>,
        population: usize,
        duration: Duration,
        max_jitter: Duration,
        action: F,
    ) -> Vec<JoinHandle<u64>>
    where
        M: Metric,
        F: Fn(usize) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = M> + Send + 'static,
    {
        (0..population)
            .map(|index| {
                let mut start = start.clone();
                let metrics = metrics.clone();
                let action = action.clone();
                tokio::spawn(async move {
                    let mut rng = ChaCha8Rng::from_entropy();
                    if start.wait_for(|running| *running).await.is_err() {
                        return 0;
                    }
                    tracing::debug!("Client {index} started");

                    let deadline = Instant::now() + duration;
                    let mut issued = 0u64;
                    // New attempts stop at the deadline; the attempt already
                    // in flight always runs to completion.
                    while Instant::now() < deadline {
                        let metric = action(index).await;
                        issued += 1;
                        if metrics.send(metric).await.is_err() {
                            break;
                        }
                        let pause = jitter(&mut rng, max_jitter);
                        if !pause.is_zero() {
                            tokio::time::sleep(pause).await;
                        }
                    }

                    tracing::debug!("Client {index} exiting after {issued} attempts");
                    issued
                })
            })
            .collect()
    }

    /// Uniform-random pause in `[0, max)`.
    pub(super) fn jitter(rng: &mut impl Rng, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        max.mul_f64(rng.gen_range(0.0..1.0))
    }
}
