//! Client construction

use crate::client::StoreClient;
use crate::config::HubConfig;
use crate::error::ConfigError;
use crate::transport::{GrpcStoreTransport, StoreTransport};
use hub_auth::{AuthClient, AuthConfig, AuthInterceptor, GrpcTokenIssuer, TokenIssuer};
use resilience::{store_service_config, CircuitBreaker, CircuitBreakerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Name of the breaker created when none is injected
pub const DEFAULT_BREAKER_NAME: &str = "cerbos-hub";

#[derive(Debug)]
pub struct HubClientBuilder {
    config: HubConfig,
    circuit_breaker: Option<CircuitBreaker>,
    circuit_breaker_config: CircuitBreakerConfig,
    auth_config: Option<AuthConfig>,
}

impl HubClientBuilder {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            circuit_breaker: None,
            circuit_breaker_config: store_service_config().circuit_breaker,
            auth_config: None,
        }
    }

    /// Endpoint, credentials and timeout from `CERBOS_HUB_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(HubConfig::from_env()?))
    }

    /// Explicit credentials; endpoint and timeout still come from `CERBOS_HUB_*` variables
    pub fn from_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(HubConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..HubConfig::from_env()?
        }))
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.api_endpoint = endpoint.into();
        self
    }

    /// Deadline of every call, token exchange included
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Share an existing breaker, e.g. between several clients of the same backend
    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    /// Ignored when a breaker is injected with [`with_circuit_breaker`](Self::with_circuit_breaker)
    pub fn with_circuit_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker_config = config;
        self
    }

    pub fn with_auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = Some(config);
        self
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Build a client over a lazily connected TLS channel.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<HubClient, ConfigError> {
        if self.circuit_breaker.is_none() {
            self.circuit_breaker_config.validate()?;
        }
        let channel = self.config.make_endpoint()?.connect_lazy();
        info!(endpoint = %self.config.endpoint_uri(), "Cerbos Hub client configured");

        Ok(self.build_with(
            Arc::new(GrpcTokenIssuer::new(channel.clone())),
            Arc::new(GrpcStoreTransport::new(channel)),
        ))
    }

    /// Build a client over caller-supplied transports
    ///
    /// Invalid breaker settings are replaced with their defaults.
    pub fn build_with(
        self,
        issuer: Arc<dyn TokenIssuer>,
        transport: Arc<dyn StoreTransport>,
    ) -> HubClient {
        let timeout = self.config.timeout();
        let auth_config = self.auth_config.unwrap_or_else(|| AuthConfig {
            timeout,
            ..Default::default()
        });
        let breaker = self.circuit_breaker.unwrap_or_else(|| {
            CircuitBreaker::named(DEFAULT_BREAKER_NAME, self.circuit_breaker_config)
        });

        let auth = Arc::new(AuthClient::with_config(
            self.config.credentials(),
            issuer,
            auth_config,
        ));
        let store = StoreClient::new(
            transport,
            AuthInterceptor::new(auth.clone()),
            breaker,
            timeout,
        );

        HubClient { auth, store }
    }
}

/// Entry point to Cerbos Hub services
#[derive(Clone, Debug)]
pub struct HubClient {
    auth: Arc<AuthClient>,
    store: StoreClient,
}

impl HubClient {
    pub fn store_client(&self) -> StoreClient {
        self.store.clone()
    }

    pub fn auth_client(&self) -> &Arc<AuthClient> {
        &self.auth
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        self.store.circuit_breaker()
    }
}
