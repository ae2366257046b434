/// Cerbos Hub connection configuration
///
/// Loaded from `CERBOS_HUB_*` environment variables or built directly.
use crate::error::ConfigError;
use hub_auth::Credentials;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tonic::transport::{ClientTlsConfig, Endpoint};

pub const ENV_PREFIX: &str = "CERBOS_HUB_";
pub const DEFAULT_API_ENDPOINT: &str = "https://api.cerbos.cloud";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Clone, Deserialize)]
pub struct HubConfig {
    /// `CERBOS_HUB_API_ENDPOINT`
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// `CERBOS_HUB_CLIENT_ID`
    #[serde(default)]
    pub client_id: String,

    /// `CERBOS_HUB_CLIENT_SECRET`
    #[serde(default)]
    pub client_secret: String,

    /// `CERBOS_HUB_TIMEOUT_MS`: deadline of every call, token exchange included
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl fmt::Debug for HubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl HubConfig {
    /// Load configuration from environment variables
    /// Blank values fall back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config: HubConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        if config.api_endpoint.trim().is_empty() {
            config.api_endpoint = default_api_endpoint();
        }
        config.client_id = config.client_id.trim().to_string();
        config.client_secret = config.client_secret.trim().to_string();
        Ok(config)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.client_id.clone(), self.client_secret.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Endpoint URI with a scheme; `dns:///host` and bare `host[:port]` targets become https
    pub fn endpoint_uri(&self) -> String {
        let target = self.api_endpoint.trim();
        let target = target.strip_prefix("dns:///").unwrap_or(target);
        if target.contains("://") {
            target.to_string()
        } else {
            format!("https://{}", target)
        }
    }

    /// Build the tonic endpoint: TLS with native roots for https targets, user agent, connect timeout
    pub fn make_endpoint(&self) -> Result<Endpoint, ConfigError> {
        let uri = self.endpoint_uri();
        let mut endpoint =
            Endpoint::from_shared(uri.clone()).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: uri.clone(),
                reason: e.to_string(),
            })?;

        endpoint = endpoint
            .user_agent(user_agent())?
            .connect_timeout(self.timeout())
            .tcp_nodelay(true);

        if uri.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }

        Ok(endpoint)
    }
}

/// User agent sent on every call
pub fn user_agent() -> String {
    format!(
        "cerbos-hub-rs/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
