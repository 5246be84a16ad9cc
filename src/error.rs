use thiserror::Error;

/// Setup failures are fatal: there is no meaningful race test without a
/// provisioned context, so none of these are retried. Each variant carries
/// the raw response so a broken backend can be diagnosed from the log alone.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("login failed with status {status}: {body}")]
    Login { status: u16, body: String },

    /// The login returned 200 but the payload is unusable. A malformed
    /// success is a setup failure, never a silent continue.
    #[error("login response missing access_token or user id: {body}")]
    Credentials { body: String },

    #[error("product creation failed with status {status}: {body}")]
    ProductCreation { status: u16, body: String },

    #[error("product response missing id: {body}")]
    ProductId { body: String },

    #[error("transport failure during setup: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Top-level failure of a storm run. Individual attempt failures are data
/// (classified into the `Error` outcome bucket), not errors; only losing the
/// setup phase or the aggregator itself aborts a run.
#[derive(Debug, Error)]
pub enum StormError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("aggregator task failed: {0}")]
    Aggregator(#[from] tokio::task::JoinError),
}
