//! Standalone orchestrator: provision, storm, report, in strict phase order.

use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{error, info, warn};

use squall::aggregate::StormAggregate;
use squall::checkout::checkout_attempt;
use squall::provision::provision;
use squall::report::StormReport;
use squall::{Reporter, Scenario, SetupError, StdoutReporter, StormConfig, StormError, StormExecutor};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = StormConfig::from_env();
    match run(&config).await {
        Ok(report) if report.passed() => ExitCode::SUCCESS,
        Ok(_) => {
            error!("Threshold breach, see the summary above");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Storm aborted: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &StormConfig) -> Result<StormReport, StormError> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(SetupError::from)?;
    let mut rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let race = provision(&client, &config.base_url, &mut rng, epoch_ms).await?;
    info!(product_id = %race.product_id, "Provisioned contested product");

    let action_client = client.clone();
    let action_race = race.clone();
    let aggregate = Scenario::<StormAggregate, _, _, _>::builder()
        .name("checkout storm")
        .action(move |client_index| {
            let client = action_client.clone();
            let race = action_race.clone();
            async move { checkout_attempt(&client, &race, client_index).await }
        })
        .executor(
            StormExecutor::builder()
                .population(config.population)
                .duration(config.duration)
                .max_jitter(config.max_jitter)
                .build(),
        )
        .build()
        .run()
        .await?;

    let report = StormReport::evaluate(&aggregate, &config.thresholds());
    if let Err(e) = StdoutReporter.report(report.clone()).await {
        warn!("Could not emit report: {e}");
    }

    info!(product_id = %race.product_id, "Teardown: verify stock in the system of record, total sold must not exceed the initial stock");
    Ok(report)
}
