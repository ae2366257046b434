/// Resilience patterns for remote calls
///
/// This library provides:
/// - **Circuit Breaker**: Fails fast once the failure or slow-call rate over a rolling window
///   crosses its threshold, then probes the backend before closing again
/// - **Timeout**: Enforces a client-side deadline on a call
/// - **Preset Configurations**: Pre-tuned settings for the hosted store service
///
/// # Example: gRPC call with Circuit Breaker
///
/// ```rust,no_run
/// use resilience::{presets, CircuitBreaker};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::store_service_config();
///     let circuit_breaker = CircuitBreaker::named("store", config.circuit_breaker);
///
///     let result = circuit_breaker
///         .call_with(
///             || async {
///                 // Your gRPC call here
///                 Ok::<_, tonic::Status>(())
///             },
///             |status| status.code() != tonic::Code::Cancelled,
///         )
///         .await;
/// }
/// ```

pub mod circuit_breaker;
pub mod metrics;
pub mod presets;
pub mod timeout;

// Re-export main types for convenience
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigError, CircuitBreakerError,
    CircuitState, SlidingWindow,
};
pub use presets::{store_service_config, ServiceConfig};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
