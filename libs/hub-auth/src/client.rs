//! Token cache and refresh
//!
//! [`AuthClient`] owns the current [`AccessToken`] and performs the token exchange when it is
//! missing or stale. Reads run in parallel under the read lock; a refresh takes the write lock and
//! re-checks the cache first, so callers racing the same expiry trigger a single exchange.

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::issuer::TokenIssuer;
use crate::token::{deadline_after, AccessToken};
use resilience::{with_timeout, TimeoutError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tonic::{Code, Status};
use tracing::{debug, error, info, warn};

/// Token lifecycle settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Subtracted from the server-reported lifetime so tokens are refreshed early
    pub expiry_buffer: Duration,
    /// How long to fail fast after the exchange reported rate limiting
    pub rate_limit_backoff: Duration,
    /// Deadline of the exchange call
    pub timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            expiry_buffer: Duration::from_secs(5 * 60),
            rate_limit_backoff: Duration::from_secs(5 * 60),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<AccessToken>,
    /// Monotonic: never cleared once set
    permanently_unauthenticated: bool,
    backoff_until: Option<Instant>,
}

impl TokenState {
    /// Cached token if usable, an error if the caller must fail fast, `None` if a refresh is due
    fn current(&self, now: Instant) -> Result<Option<AccessToken>, AuthError> {
        if self.permanently_unauthenticated {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(token) = self.token.as_ref().filter(|t| t.is_valid(now)) {
            return Ok(Some(token.clone()));
        }

        if self.backoff_until.is_some_and(|until| until > now) {
            return Err(AuthError::TooManyRequests);
        }

        Ok(None)
    }
}

/// Client-credentials token cache
pub struct AuthClient {
    credentials: Credentials,
    issuer: Arc<dyn TokenIssuer>,
    config: AuthConfig,
    state: RwLock<TokenState>,
    exchanges: AtomicU64,
}

impl AuthClient {
    pub fn new(credentials: Credentials, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self::with_config(credentials, issuer, AuthConfig::default())
    }

    pub fn with_config(
        credentials: Credentials,
        issuer: Arc<dyn TokenIssuer>,
        config: AuthConfig,
    ) -> Self {
        if credentials.is_empty() {
            warn!(
                client_id = credentials.client_id(),
                "Client credentials are empty; the token exchange will be rejected"
            );
        }

        Self {
            credentials,
            issuer,
            config,
            state: RwLock::new(TokenState::default()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return a valid token, refreshing it if needed.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] once the exchange has rejected the credentials; no
    ///   further exchange is attempted by this instance.
    /// - [`AuthError::TooManyRequests`] while a rate-limit backoff is in effect.
    /// - [`AuthError::Exchange`] for any other exchange failure, including its deadline.
    pub async fn authenticate(&self) -> Result<AccessToken, AuthError> {
        {
            let state = self.state.read().await;
            if let Some(token) = state.current(Instant::now())? {
                return Ok(token);
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = state.current(Instant::now())? {
            return Ok(token);
        }

        self.exchange(&mut state).await
    }

    async fn exchange(&self, state: &mut TokenState) -> Result<AccessToken, AuthError> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);
        debug!(client_id = self.credentials.client_id(), "Exchanging credentials for access token");

        let result = with_timeout(
            self.config.timeout,
            self.issuer
                .issue_access_token(&self.credentials, self.config.timeout),
        )
        .await
        .unwrap_or_else(|elapsed: TimeoutError| {
            Err(Status::deadline_exceeded(format!("token exchange: {}", elapsed)))
        });

        match result {
            Ok(issued) => {
                let token = AccessToken::issued_at(
                    issued.access_token,
                    Instant::now(),
                    issued.expires_in,
                    self.config.expiry_buffer,
                );
                info!(
                    expires_in_secs = issued.expires_in.as_secs(),
                    "Access token refreshed"
                );
                state.token = Some(token.clone());
                state.backoff_until = None;
                Ok(token)
            }
            Err(status) if status.code() == Code::Unauthenticated => {
                error!(
                    client_id = self.credentials.client_id(),
                    "Token exchange rejected the credentials; authentication disabled for this client"
                );
                state.permanently_unauthenticated = true;
                state.token = None;
                Err(AuthError::InvalidCredentials)
            }
            Err(status) if status.code() == Code::ResourceExhausted => {
                warn!(
                    backoff_secs = self.config.rate_limit_backoff.as_secs(),
                    "Token exchange rate limited"
                );
                state.backoff_until =
                    Some(deadline_after(Instant::now(), self.config.rate_limit_backoff));
                Err(AuthError::TooManyRequests)
            }
            Err(status) => {
                warn!(code = ?status.code(), message = status.message(), "Token exchange failed");
                Err(AuthError::Exchange(status))
            }
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Number of token exchanges attempted by this instance
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    pub async fn is_permanently_unauthenticated(&self) -> bool {
        self.state.read().await.permanently_unauthenticated
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("credentials", &self.credentials)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
