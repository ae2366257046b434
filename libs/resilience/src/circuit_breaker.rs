/// Circuit Breaker implementation with rolling-window failure and slow-call rate tracking
///
/// State transitions:
/// - Closed → Open: when the window holds at least `minimum_calls` outcomes and the failure rate
///   or slow-call rate reaches its threshold
/// - Open → HalfOpen: on the first call after `wait_duration_in_open`
/// - HalfOpen → Closed: when all `permitted_calls_in_half_open` probes succeed
/// - HalfOpen → Open: on any probe failure (wait timer restarts)
use crate::metrics::CircuitBreakerMetrics;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, requests pass through
    Closed,
    /// Circuit is open, requests fail fast
    Open,
    /// Testing if service recovered, limited requests allowed
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Shape of the rolling window that outcomes are recorded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidingWindow {
    /// Keep the last N outcomes
    CountBased(usize),
    /// Keep the outcomes recorded within the last duration
    TimeBased(Duration),
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure rate (percent, 0-100) at or above which the circuit opens
    pub failure_rate_threshold: f64,
    /// Slow-call rate (percent, 0-100) at or above which the circuit opens
    pub slow_call_rate_threshold: f64,
    /// Calls taking at least this long are recorded as slow
    pub slow_call_duration_threshold: Duration,
    /// Outcomes required in the window before rates are evaluated
    pub minimum_calls: usize,
    /// Rolling window for rate calculation
    pub sliding_window: SlidingWindow,
    /// Duration to wait before transitioning from Open to HalfOpen
    pub wait_duration_in_open: Duration,
    /// Probe calls admitted while HalfOpen
    pub permitted_calls_in_half_open: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 60.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: Duration::from_secs(60),
            minimum_calls: 5,
            sliding_window: SlidingWindow::TimeBased(Duration::from_secs(10)),
            wait_duration_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: 2,
        }
    }
}

impl CircuitBreakerConfig {
    /// Reject settings under which the breaker could never close again or would open on successes
    pub fn validate(&self) -> Result<(), CircuitBreakerConfigError> {
        for (field, value) in [
            ("failure_rate_threshold", self.failure_rate_threshold),
            ("slow_call_rate_threshold", self.slow_call_rate_threshold),
        ] {
            if !valid_threshold(value) {
                return Err(CircuitBreakerConfigError::InvalidThreshold { field, value });
            }
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(CircuitBreakerConfigError::NoHalfOpenProbes);
        }
        Ok(())
    }

    /// Replace invalid settings with their defaults
    fn sanitized(mut self, name: &str) -> Self {
        let defaults = Self::default();
        if !valid_threshold(self.failure_rate_threshold) {
            warn!(
                breaker = name,
                value = self.failure_rate_threshold,
                "Invalid failure rate threshold, using default"
            );
            self.failure_rate_threshold = defaults.failure_rate_threshold;
        }
        if !valid_threshold(self.slow_call_rate_threshold) {
            warn!(
                breaker = name,
                value = self.slow_call_rate_threshold,
                "Invalid slow-call rate threshold, using default"
            );
            self.slow_call_rate_threshold = defaults.slow_call_rate_threshold;
        }
        if self.permitted_calls_in_half_open == 0 {
            warn!(breaker = name, "No half-open probes configured, admitting one");
            self.permitted_calls_in_half_open = 1;
        }
        self
    }
}

/// Thresholds are percentages in (0, 100]
fn valid_threshold(value: f64) -> bool {
    value > 0.0 && value <= 100.0
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CircuitBreakerConfigError {
    #[error("{field} must be within (0, 100], got {value}")]
    InvalidThreshold { field: &'static str, value: f64 },
    #[error("permitted_calls_in_half_open must be at least 1")]
    NoHalfOpenProbes,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    config: Arc<CircuitBreakerConfig>,
    state: Arc<RwLock<CircuitBreakerState>>,
}

struct CircuitBreakerState {
    current: CircuitState,
    opened_at: Option<Instant>,
    /// Bumped on every transition; outcomes admitted under an older generation are dropped
    generation: u64,
    window: VecDeque<Outcome>,
    half_open_admitted: u32,
    half_open_successes: u32,
}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    at: Instant,
    failed: bool,
    slow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallResult {
    Success { slow: bool },
    Failure { slow: bool },
    Ignored,
}

/// An admitted call; dropping it unsettled (the caller's future was cancelled) counts as ignored
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    fn settle(mut self, result: CallResult) {
        self.settled = true;
        self.breaker.on_result(self.generation, result);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_result(self.generation, CallResult::Ignored);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open - failing fast")]
    Open,
    #[error(transparent)]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Open => None,
            CircuitBreakerError::Inner(e) => Some(e),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::named("default", config)
    }

    /// Build a breaker; invalid settings are replaced with defaults and logged
    pub fn named(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let config = config.sanitized(&name);
        Self::build(name, config)
    }

    /// Build a breaker, rejecting an invalid configuration
    pub fn try_named(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
    ) -> Result<Self, CircuitBreakerConfigError> {
        config.validate()?;
        Ok(Self::build(name.into(), config))
    }

    fn build(name: String, config: CircuitBreakerConfig) -> Self {
        let capacity = match config.sliding_window {
            SlidingWindow::CountBased(size) => size,
            SlidingWindow::TimeBased(_) => 64,
        };

        Self {
            name: Arc::from(name),
            state: Arc::new(RwLock::new(CircuitBreakerState {
                current: CircuitState::Closed,
                opened_at: None,
                generation: 0,
                window: VecDeque::with_capacity(capacity),
                half_open_admitted: 0,
                half_open_successes: 0,
            })),
            config: Arc::new(config),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Execute a future with circuit breaker protection; every error counts as a failure
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call_with(f, |_| true).await
    }

    /// Execute a future with circuit breaker protection.
    ///
    /// Errors for which `counts_as_failure` returns false are handed back to the caller without
    /// touching the breaker statistics.
    pub async fn call_with<F, Fut, T, E, P>(
        &self,
        f: F,
        counts_as_failure: P,
    ) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnOnce(&E) -> bool,
    {
        let Some(generation) = self.try_acquire() else {
            CircuitBreakerMetrics::record_call(&self.name, CircuitState::Open.as_str(), "rejected");
            debug!(breaker = %self.name, "Circuit breaker rejected call");
            return Err(CircuitBreakerError::Open);
        };

        let permit = Permit {
            breaker: self,
            generation,
            settled: false,
        };
        let started = Instant::now();
        let result = f().await;
        let slow = started.elapsed() >= self.config.slow_call_duration_threshold;

        match result {
            Ok(value) => {
                permit.settle(CallResult::Success { slow });
                Ok(value)
            }
            Err(e) => {
                let outcome = if counts_as_failure(&e) {
                    CallResult::Failure { slow }
                } else {
                    CallResult::Ignored
                };
                permit.settle(outcome);
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Admit a call, returning the generation it was admitted under
    fn try_acquire(&self) -> Option<u64> {
        let mut state = self.state.write();

        if state.current == CircuitState::Open {
            let waited = state
                .opened_at
                .map(|opened_at| opened_at.elapsed() >= self.config.wait_duration_in_open)
                .unwrap_or(true);
            if !waited {
                return None;
            }
            self.transition(&mut state, CircuitState::HalfOpen);
        }

        match state.current {
            CircuitState::Closed => Some(state.generation),
            CircuitState::HalfOpen => {
                if state.half_open_admitted < self.config.permitted_calls_in_half_open {
                    state.half_open_admitted += 1;
                    Some(state.generation)
                } else {
                    None
                }
            }
            CircuitState::Open => None,
        }
    }

    fn on_result(&self, generation: u64, result: CallResult) {
        let mut state = self.state.write();
        let label = match result {
            CallResult::Success { slow: true } => "slow_success",
            CallResult::Success { slow: false } => "success",
            CallResult::Failure { .. } => "failure",
            CallResult::Ignored => "ignored",
        };
        CircuitBreakerMetrics::record_call(&self.name, state.current.as_str(), label);

        if state.generation != generation {
            debug!(breaker = %self.name, "Dropping outcome recorded under a previous circuit state");
            return;
        }

        match state.current {
            CircuitState::Closed => {
                let (failed, slow) = match result {
                    CallResult::Success { slow } => (false, slow),
                    CallResult::Failure { slow } => (true, slow),
                    CallResult::Ignored => return,
                };

                let now = Instant::now();
                self.add_to_window(&mut state, Outcome { at: now, failed, slow });
                self.evict_expired(&mut state, now);

                if state.window.len() < self.minimum_calls() {
                    return;
                }

                let failure_rate = Self::rate(&state.window, |o| o.failed);
                let slow_call_rate = Self::rate(&state.window, |o| o.slow);
                if failure_rate >= self.config.failure_rate_threshold
                    || slow_call_rate >= self.config.slow_call_rate_threshold
                {
                    warn!(
                        breaker = %self.name,
                        calls = state.window.len(),
                        failure_rate,
                        slow_call_rate,
                        "Circuit breaker: Closed → Open"
                    );
                    self.transition(&mut state, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => match result {
                CallResult::Success { .. } => {
                    state.half_open_successes += 1;
                    if state.half_open_successes >= self.config.permitted_calls_in_half_open {
                        info!(breaker = %self.name, "Circuit breaker: HalfOpen → Closed");
                        self.transition(&mut state, CircuitState::Closed);
                    }
                }
                CallResult::Failure { .. } => {
                    warn!(breaker = %self.name, "Circuit breaker: HalfOpen → Open (probe failed)");
                    self.transition(&mut state, CircuitState::Open);
                }
                CallResult::Ignored => {
                    // Give the probe slot back
                    state.half_open_admitted = state.half_open_admitted.saturating_sub(1);
                }
            },
            CircuitState::Open => {}
        }
    }

    fn transition(&self, state: &mut CircuitBreakerState, to: CircuitState) {
        let from = state.current;
        if from == CircuitState::Open {
            if let Some(opened_at) = state.opened_at {
                CircuitBreakerMetrics::record_open_duration(
                    &self.name,
                    opened_at.elapsed().as_secs_f64(),
                );
            }
        }
        CircuitBreakerMetrics::record_state_transition(&self.name, from.as_str(), to.as_str());

        state.current = to;
        state.generation += 1;
        state.half_open_admitted = 0;
        state.half_open_successes = 0;
        match to {
            CircuitState::Open => state.opened_at = Some(Instant::now()),
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, "Circuit breaker: Open → HalfOpen");
                state.opened_at = None;
            }
            CircuitState::Closed => {
                state.opened_at = None;
                state.window.clear();
            }
        }
    }

    fn add_to_window(&self, state: &mut CircuitBreakerState, outcome: Outcome) {
        if let SlidingWindow::CountBased(size) = self.config.sliding_window {
            while state.window.len() >= size.max(1) {
                state.window.pop_front();
            }
        }
        state.window.push_back(outcome);
    }

    fn evict_expired(&self, state: &mut CircuitBreakerState, now: Instant) {
        if let SlidingWindow::TimeBased(span) = self.config.sliding_window {
            while let Some(oldest) = state.window.front() {
                if now.duration_since(oldest.at) >= span {
                    state.window.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    fn minimum_calls(&self) -> usize {
        let minimum = self.config.minimum_calls.max(1);
        match self.config.sliding_window {
            SlidingWindow::CountBased(size) => minimum.min(size.max(1)),
            SlidingWindow::TimeBased(_) => minimum,
        }
    }

    fn rate(window: &VecDeque<Outcome>, pick: impl Fn(&Outcome) -> bool) -> f64 {
        if window.is_empty() {
            return 0.0;
        }

        let hits = window.iter().filter(|o| pick(o)).count();
        hits as f64 * 100.0 / window.len() as f64
    }

    /// Get current circuit state (for monitoring)
    pub fn state(&self) -> CircuitState {
        self.state.read().current
    }

    /// Failure rate in percent over the current window (for monitoring)
    pub fn failure_rate(&self) -> f64 {
        let mut state = self.state.write();
        self.evict_expired(&mut state, Instant::now());
        Self::rate(&state.window, |o| o.failed)
    }

    /// Slow-call rate in percent over the current window (for monitoring)
    pub fn slow_call_rate(&self) -> f64 {
        let mut state = self.state.write();
        self.evict_expired(&mut state, Instant::now());
        Self::rate(&state.window, |o| o.slow)
    }

    /// Force the breaker back to Closed with an empty window
    pub fn reset(&self) {
        let mut state = self.state.write();
        if state.current != CircuitState::Closed {
            self.transition(&mut state, CircuitState::Closed);
        } else {
            state.window.clear();
            state.generation += 1;
        }
    }
}
