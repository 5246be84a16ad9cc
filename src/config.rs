//! Run configuration: builder defaults mirroring the storm's canonical
//! shape, each overridable from the environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::report::Thresholds;

/// Knobs for one storm run.
///
/// Environment overrides: `BASE_URL`, `STORM_CLIENTS`, `STORM_DURATION_MS`,
/// `STORM_MAX_JITTER_MS`, `STORM_MAX_ERROR_RATE`, `STORM_P95_LIMIT_MS`,
/// `STORM_REQUEST_TIMEOUT_MS`, `STORM_SEED`.
#[derive(TypedBuilder, Debug, Clone)]
pub struct StormConfig {
    /// Base endpoint of the service under test.
    #[builder(default = "http://localhost:8080".to_string(), setter(into))]
    pub base_url: String,
    /// Concurrent virtual clients. Large relative to the provisioned stock
    /// so the oversell boundary actually gets hit.
    #[builder(default = 100)]
    pub population: usize,
    /// Wall-clock attempt window.
    #[builder(default = Duration::from_secs(1))]
    pub duration: Duration,
    /// Ceiling of the random pause between a client's iterations.
    #[builder(default = Duration::from_millis(500))]
    pub max_jitter: Duration,
    /// Ceiling on `errors / attempts` before the run fails.
    #[builder(default = 0.1)]
    pub max_error_rate: f64,
    /// Ceiling on 95th-percentile attempt latency before the run fails.
    #[builder(default = Duration::from_secs(5))]
    pub p95_limit: Duration,
    /// Per-request timeout for every HTTP call the harness makes.
    #[builder(default = Duration::from_secs(30))]
    pub request_timeout: Duration,
    /// Fixed RNG seed for reproducible provisioning payloads.
    #[builder(default)]
    pub seed: Option<u64>,
}

impl StormConfig {
    /// Build a config from the environment, falling back to the defaults.
    /// Unparsable values are warned about and ignored rather than fatal.
    pub fn from_env() -> Self {
        let defaults = StormConfig::builder().build();
        StormConfig::builder()
            .base_url(env_or("BASE_URL", defaults.base_url))
            .population(env_or("STORM_CLIENTS", defaults.population))
            .duration(millis_env_or("STORM_DURATION_MS", defaults.duration))
            .max_jitter(millis_env_or("STORM_MAX_JITTER_MS", defaults.max_jitter))
            .max_error_rate(env_or("STORM_MAX_ERROR_RATE", defaults.max_error_rate))
            .p95_limit(millis_env_or("STORM_P95_LIMIT_MS", defaults.p95_limit))
            .request_timeout(millis_env_or(
                "STORM_REQUEST_TIMEOUT_MS",
                defaults.request_timeout,
            ))
            .seed(std::env::var("STORM_SEED").ok().and_then(|raw| parse_or_warn("STORM_SEED", &raw)))
            .build()
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            max_error_rate: self.max_error_rate,
            p95_limit: self.p95_limit,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_or_warn(key, &raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn millis_env_or(key: &str, default: Duration) -> Duration {
    Duration::from_millis(env_or(key, default.as_millis() as u64))
}

fn parse_or_warn<T>(key: &str, raw: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {key}={raw}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_canonical_storm_shape() {
        let config = StormConfig::builder().build();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.population, 100);
        assert_eq!(config.duration, Duration::from_secs(1));
        assert_eq!(config.max_jitter, Duration::from_millis(500));
        assert_eq!(config.max_error_rate, 0.1);
        assert_eq!(config.p95_limit, Duration::from_secs(5));
        assert_eq!(config.seed, None);
    }

    #[test]
    fn thresholds_come_from_the_config() {
        let config = StormConfig::builder()
            .max_error_rate(0.25)
            .p95_limit(Duration::from_secs(2))
            .build();
        let thresholds = config.thresholds();
        assert_eq!(thresholds.max_error_rate, 0.25);
        assert_eq!(thresholds.p95_limit, Duration::from_secs(2));
    }

    #[test]
    fn unparsable_values_fall_back_to_the_default() {
        assert_eq!(parse_or_warn::<usize>("STORM_CLIENTS", "not-a-number"), None);
        assert_eq!(parse_or_warn::<usize>("STORM_CLIENTS", "32"), Some(32));
    }
}
