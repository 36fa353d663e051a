//! Circuit breaker guarding calls to a named remote dependency.
//!
//! # States
//!
//! - **Closed**: calls pass through and their outcomes are recorded in a
//!   count-based sliding window. Once the window holds at least
//!   `minimum_number_of_calls` outcomes and the failure rate reaches
//!   `failure_rate_threshold`, the circuit opens.
//! - **Open**: calls are rejected without invoking the dependency until
//!   `wait_duration_in_open_state` has elapsed.
//! - **HalfOpen**: up to `permitted_calls_in_half_open` trial calls may be in
//!   flight. The first trial success closes the circuit; any trial failure
//!   opens it again. A trial whose future is dropped before completing gives
//!   its permit back without recording an outcome.
//!
//! ```text
//! Closed ──[failure rate >= threshold]──> Open ──[wait elapsed]──> HalfOpen
//!   ^                                      ^                          │
//!   └──────────[trial success]─────────────┼──────────────────────────┤
//!                                          └──────[trial failure]─────┘
//! ```

use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Circuit guarding every call to the account ledger service.
pub const ACCOUNT_SERVICE_CB: &str = "accountServiceCB";

/// Circuit breaker policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of most recent call outcomes considered
    pub sliding_window_size: usize,
    /// Outcomes required in the window before the failure rate is evaluated
    pub minimum_number_of_calls: usize,
    /// Failure rate, in percent, at which the circuit opens
    pub failure_rate_threshold: f64,
    /// Cool-down before an open circuit lets trial calls through
    pub wait_duration_in_open_state: Duration,
    /// Trial calls allowed in flight while half-open
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sliding_window_size: 10,
            minimum_number_of_calls: 5,
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
        }
    }
}

impl CircuitBreakerConfig {
    #[must_use]
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    #[must_use]
    pub fn sliding_window_size(mut self, size: usize) -> Self {
        self.config.sliding_window_size = size.max(1);
        self
    }

    #[must_use]
    pub fn minimum_number_of_calls(mut self, calls: usize) -> Self {
        self.config.minimum_number_of_calls = calls.max(1);
        self
    }

    /// Set the failure rate threshold, in percent.
    #[must_use]
    pub fn failure_rate_threshold(mut self, percent: f64) -> Self {
        self.config.failure_rate_threshold = percent.clamp(0.0, 100.0);
        self
    }

    #[must_use]
    pub fn wait_duration_in_open_state(mut self, duration: Duration) -> Self {
        self.config.wait_duration_in_open_state = duration;
        self
    }

    #[must_use]
    pub fn permitted_calls_in_half_open(mut self, calls: usize) -> Self {
        self.config.permitted_calls_in_half_open = calls.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> CircuitBreakerConfig {
        self.config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit rejected the call without invoking the dependency
    #[error("Circuit breaker '{circuit}' is open")]
    Open { circuit: String },
    /// The dependency was invoked and failed
    #[error("{0}")]
    Inner(E),
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    /// `true` marks a failed call
    outcomes: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: usize,
    /// Bumped on every OPEN -> HALF_OPEN transition
    trial_round: u64,
}

impl BreakerState {
    fn closed(trial_round: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            outcomes: VecDeque::new(),
            opened_at: None,
            half_open_in_flight: 0,
            trial_round,
        }
    }

    fn is_current_trial(&self, round: Option<u64>) -> bool {
        self.state == CircuitState::HalfOpen && round == Some(self.trial_round)
    }

    fn failure_rate(&self) -> f64 {
        let failures = self.outcomes.iter().filter(|failed| **failed).count();
        failures as f64 * 100.0 / self.outcomes.len() as f64
    }
}

/// A named circuit breaker.
///
/// Cheap to share behind an `Arc`. All state transitions happen under a
/// single lock so concurrent calls observe a consistent window. The lock is
/// never held across an `.await`.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    total_calls: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState::closed(0)),
            total_calls: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `operation` through the breaker.
    ///
    /// # Errors
    ///
    /// Returns `CircuitBreakerError::Open` without calling `operation` when the
    /// circuit rejects the call, and `CircuitBreakerError::Inner` when the
    /// operation itself fails.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let Some(permit) = self.try_acquire() else {
            self.total_rejections.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(circuit = %self.name, "Circuit breaker is OPEN, rejecting call");
            return Err(CircuitBreakerError::Open {
                circuit: self.name.clone(),
            });
        };

        match operation().await {
            Ok(value) => {
                permit.succeeded();
                self.total_successes.fetch_add(1, Ordering::Relaxed);
                Ok(value)
            }
            Err(err) => {
                permit.failed();
                self.total_failures.fetch_add(1, Ordering::Relaxed);
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();

        let trial_round = match state.state {
            CircuitState::Closed => None,
            CircuitState::HalfOpen => {
                if state.half_open_in_flight >= self.config.permitted_calls_in_half_open {
                    return None;
                }
                state.half_open_in_flight += 1;
                Some(state.trial_round)
            }
            CircuitState::Open => {
                let cooled_down = state
                    .opened_at
                    .is_none_or(|at| at.elapsed() >= self.config.wait_duration_in_open_state);
                if !cooled_down {
                    return None;
                }
                tracing::info!(circuit = %self.name, "Circuit breaker transitioning OPEN -> HALF_OPEN");
                state.state = CircuitState::HalfOpen;
                state.trial_round += 1;
                state.half_open_in_flight = 1;
                Some(state.trial_round)
            }
        };

        Some(Permit {
            breaker: self,
            trial_round,
            settled: false,
        })
    }

    fn on_success(&self, trial_round: Option<u64>) {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => self.record(&mut state, false),
            CircuitState::HalfOpen if state.is_current_trial(trial_round) => {
                tracing::info!(circuit = %self.name, "Circuit breaker transitioning HALF_OPEN -> CLOSED");
                *state = BreakerState::closed(state.trial_round);
            }
            // Started before the circuit last opened; its outcome is stale.
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn on_failure(&self, trial_round: Option<u64>) {
        let mut state = self.lock();

        match state.state {
            CircuitState::Closed => self.record(&mut state, true),
            CircuitState::HalfOpen if state.is_current_trial(trial_round) => {
                tracing::warn!(circuit = %self.name, "Circuit breaker transitioning HALF_OPEN -> OPEN (trial call failed)");
                Self::open(&mut state);
            }
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    fn on_abandoned(&self, trial_round: Option<u64>) {
        let mut state = self.lock();

        if state.is_current_trial(trial_round) {
            tracing::debug!(circuit = %self.name, "Trial call dropped before completing, releasing permit");
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }
    }

    fn record(&self, state: &mut BreakerState, failed: bool) {
        state.outcomes.push_back(failed);
        while state.outcomes.len() > self.config.sliding_window_size {
            state.outcomes.pop_front();
        }

        let required = self
            .config
            .minimum_number_of_calls
            .min(self.config.sliding_window_size);
        if state.outcomes.len() < required {
            return;
        }

        let failure_rate = state.failure_rate();
        if failure_rate >= self.config.failure_rate_threshold {
            tracing::warn!(
                circuit = %self.name,
                failure_rate,
                threshold = self.config.failure_rate_threshold,
                "Circuit breaker transitioning CLOSED -> OPEN"
            );
            Self::open(state);
        }
    }

    fn open(state: &mut BreakerState) {
        state.state = CircuitState::Open;
        state.opened_at = Some(Instant::now());
        state.outcomes.clear();
        state.half_open_in_flight = 0;
    }

    #[must_use]
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
        }
    }

    /// Forces the circuit back to closed with an empty window.
    pub fn reset(&self) {
        let mut state = self.lock();
        tracing::info!(circuit = %self.name, "Circuit breaker manually reset to CLOSED");
        *state = BreakerState::closed(state.trial_round);
    }
}

/// Admission of one call through the breaker.
///
/// Settled with exactly one outcome. Dropping it unsettled, as happens when
/// the `call` future is cancelled mid-flight, releases a half-open slot.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    /// Set for half-open trial calls
    trial_round: Option<u64>,
    settled: bool,
}

impl Permit<'_> {
    fn succeeded(mut self) {
        self.settled = true;
        self.breaker.on_success(self.trial_round);
    }

    fn failed(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.trial_round);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_abandoned(self.trial_round);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    /// Calls short-circuited while the circuit was open
    pub total_rejections: u64,
}

/// Process-wide set of named circuit breakers.
///
/// Built once at startup and passed by reference to whatever needs a
/// breaker. Asking twice for the same name yields the same instance.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    default_config: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            default_config,
            overrides: HashMap::new(),
            breakers: DashMap::new(),
        }
    }

    /// Uses `config` instead of the default for the circuit called `name`.
    #[must_use]
    pub fn with_config(mut self, name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    pub fn breaker(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = self
                    .overrides
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| self.default_config.clone());
                Arc::new(CircuitBreaker::new(name, config))
            })
            .clone()
    }
}
