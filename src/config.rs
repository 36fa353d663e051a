//! Command-line and environment configuration.

use crate::application::circuit_breaker::CircuitBreakerConfig;
use clap::Args;
use std::time::Duration;

/// Policy of the circuit breaker guarding ledger calls.
#[derive(Args, Debug, Clone)]
pub struct CircuitBreakerArgs {
    /// Number of recent ledger calls the breaker evaluates
    #[arg(long = "cb-sliding-window-size", env = "CB_SLIDING_WINDOW_SIZE", default_value_t = 10)]
    pub sliding_window_size: usize,

    /// Calls required in the window before the failure rate is evaluated
    #[arg(long = "cb-minimum-calls", env = "CB_MINIMUM_CALLS", default_value_t = 5)]
    pub minimum_calls: usize,

    /// Failure rate (percent) at which the breaker opens
    #[arg(long = "cb-failure-rate-threshold", env = "CB_FAILURE_RATE_THRESHOLD", default_value_t = 50.0)]
    pub failure_rate_threshold: f64,

    /// Milliseconds the breaker stays open before allowing trial calls
    #[arg(long = "cb-open-wait-ms", env = "CB_OPEN_WAIT_MS", default_value_t = 30_000)]
    pub open_wait_ms: u64,

    /// Trial calls allowed while half-open
    #[arg(long = "cb-half-open-calls", env = "CB_HALF_OPEN_CALLS", default_value_t = 1)]
    pub half_open_calls: usize,
}

impl From<&CircuitBreakerArgs> for CircuitBreakerConfig {
    fn from(args: &CircuitBreakerArgs) -> Self {
        CircuitBreakerConfig::builder()
            .sliding_window_size(args.sliding_window_size)
            .minimum_number_of_calls(args.minimum_calls)
            .failure_rate_threshold(args.failure_rate_threshold)
            .wait_duration_in_open_state(Duration::from_millis(args.open_wait_ms))
            .permitted_calls_in_half_open(args.half_open_calls)
            .build()
    }
}

/// Where the remote collaborators live.
#[derive(Args, Debug, Clone)]
pub struct EndpointArgs {
    /// Base URL of the account ledger service. Without it an in-memory ledger is used.
    #[arg(long, env = "LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Base URL of the notification service. Without it notifications are only logged.
    #[arg(long, env = "NOTIFICATION_URL")]
    pub notification_url: Option<String>,

    /// Per-request timeout for remote calls, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    pub request_timeout_ms: u64,
}

impl EndpointArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
