/// Preset configurations for remote store calls
use crate::circuit_breaker::{CircuitBreakerConfig, SlidingWindow};
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for a service type
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        store_service_config()
    }
}

/// Hosted store service (one breaker shared by every store operation)
///
/// - Timeout: 5s per call
/// - Circuit breaker: opens at 60% failures over a 10s window once 5 calls were seen,
///   1 minute cooldown, 2 probe calls
pub fn store_service_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(5),
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_rate_threshold: 60.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration_threshold: Duration::from_secs(60),
            minimum_calls: 5,
            sliding_window: SlidingWindow::TimeBased(Duration::from_secs(10)),
            wait_duration_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: 2,
        },
    }
}
