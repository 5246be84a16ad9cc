//! Squall — a concurrency stress harness for an inventory/checkout service.
//!
//! Squall probes one invariant: a checkout backend must never sell more units
//! than it stocked, no matter how hard concurrent buyers slam into it. The
//! harness provisions a throwaway account and a single product with a
//! deliberately tiny stock, storms it with a fixed population of concurrent
//! virtual clients for a narrow wall-clock window, classifies every response,
//! and judges the run against error-rate and latency thresholds. The
//! definitive sold-versus-stock check happens against the system of record;
//! squall's job is to make the race likely, measurable, and honestly counted.
//!
//! # Architecture
//!
//! The building blocks compose the way a load-testing pipeline does:
//!
//! - [`Scenario`]: glue that ties everything together — a named action and
//!   the executor that drives it.
//! - [`Executor`]: responsible for actually running the scenario. The
//!   [`StormExecutor`] drives a fixed population of independent virtual
//!   clients for a fixed duration; executors are replaceable.
//! - [`Metric`]: the smallest unit produced by an action. Here that is an
//!   [`Attempt`](metric::Attempt) — one purchase try with its raw status and
//!   latency.
//! - [`Aggregate`]: a mergeable collector of metrics. The
//!   [`StormAggregate`](aggregate::StormAggregate) keeps outcome counters and
//!   raw latency samples.
//! - [`Report`]/[`Reporter`]: final statistics, threshold verdicts, and the
//!   sink they go to.
//!
//! Setup lives in [`provision`](provision::provision), which produces the
//! immutable [`RaceContext`](provision::RaceContext) every client shares, and
//! the per-attempt action lives in
//! [`checkout_attempt`](checkout::checkout_attempt). Data flows one way:
//! provisioner → storm executor → aggregator → report.
//!
//! # Example
//!
//! ```no_run
//! use squall::{
//!     Scenario, StdoutReporter, Reporter,
//!     aggregate::StormAggregate,
//!     checkout::checkout_attempt,
//!     executor::StormExecutor,
//!     provision::provision,
//!     report::{StormReport, Thresholds},
//! };
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use std::time::{Duration, SystemTime, UNIX_EPOCH};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // NEVER instantiate heavy objects like clients inside the action —
//!     // doing so would severely impact performance.
//!     let client = reqwest::Client::new();
//!     let mut rng = ChaCha8Rng::seed_from_u64(7);
//!     let epoch_ms = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
//!
//!     let race = provision(&client, "http://localhost:8080", &mut rng, epoch_ms).await?;
//!
//!     let action_client = client.clone();
//!     let action_race = race.clone();
//!     let aggregate = Scenario::<StormAggregate, _, _, _>::builder()
//!         .name("checkout storm")
//!         .action(move |client_index| {
//!             let client = action_client.clone();
//!             let race = action_race.clone();
//!             async move { checkout_attempt(&client, &race, client_index).await }
//!         })
//!         .executor(
//!             StormExecutor::builder()
//!                 .population(100)
//!                 .duration(Duration::from_secs(1))
//!                 .build(),
//!         )
//!         .build()
//!         .run()
//!         .await?;
//!
//!     let report = StormReport::evaluate(&aggregate, &Thresholds::default());
//!     StdoutReporter.report(report).await?;
//!     Ok(())
//! }
//! ```

/// Metric aggregators
pub mod aggregate;
/// The per-attempt checkout action
pub mod checkout;
/// Run configuration and environment overrides
pub mod config;
/// Setup and run failure types
pub mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// Single metrics
pub mod metric;
/// One-time setup against the service under test
pub mod provision;
/// Reports and Reporters
pub mod report;
/// Main module of the harness that glues everything together
pub mod scenario;

pub use aggregate::Aggregate;
pub use config::StormConfig;
pub use error::{SetupError, StormError};
pub use executor::{Executor, StormExecutor};
pub use metric::Metric;
pub use report::{Report, Reporter, StdoutReporter};
pub use scenario::Scenario;
