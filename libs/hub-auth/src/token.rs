//! Short-lived bearer token issued by the token exchange

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on how far into the future a computed deadline may lie
pub const MAX_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Immutable bearer token with an absolute expiry
///
/// A refresh produces a new value; existing values are never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: Arc<str>,
    expiry: Instant,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expiry: Instant) -> Self {
        Self {
            token: Arc::from(token.into()),
            expiry,
        }
    }

    /// Build a token from the server-reported lifetime.
    ///
    /// `expiry_buffer` is subtracted from `expires_in` so the client refreshes ahead of the
    /// server, unless the lifetime is no longer than the buffer; then the raw lifetime is used.
    pub fn issued_at(
        token: impl Into<String>,
        now: Instant,
        expires_in: Duration,
        expiry_buffer: Duration,
    ) -> Self {
        Self::new(token, deadline_after(now, buffered_lifetime(expires_in, expiry_buffer)))
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn expiry(&self) -> Instant {
        self.expiry
    }

    pub fn is_valid(&self, now: Instant) -> bool {
        self.expiry > now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Lifetime to cache a token for
pub fn buffered_lifetime(expires_in: Duration, expiry_buffer: Duration) -> Duration {
    if expires_in > expiry_buffer {
        expires_in - expiry_buffer
    } else {
        expires_in
    }
}

/// `now + after`, capped at [`MAX_LIFETIME`] so server-reported durations cannot overflow
pub fn deadline_after(now: Instant, after: Duration) -> Instant {
    let after = after.min(MAX_LIFETIME);
    now.checked_add(after).unwrap_or(now)
}
