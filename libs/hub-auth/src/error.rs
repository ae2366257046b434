//! Authentication errors

use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The token exchange rejected the credentials. Permanent for the client instance.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The token exchange is rate limited; retry after the backoff window
    #[error("Too many requests")]
    TooManyRequests,

    /// Any other token exchange failure
    #[error("Token exchange failed: {0}")]
    Exchange(Status),

    /// The issued token cannot be carried in request metadata
    #[error("Access token is not a valid header value")]
    MalformedToken,
}

impl AuthError {
    /// Whether the failure will never resolve for this client instance
    pub fn is_permanent(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials)
    }
}

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Status::unauthenticated("invalid credentials"),
            AuthError::TooManyRequests => Status::resource_exhausted("too many requests"),
            AuthError::Exchange(status) => status,
            AuthError::MalformedToken => Status::internal("malformed access token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    #[test]
    fn test_only_invalid_credentials_is_permanent() {
        assert!(AuthError::InvalidCredentials.is_permanent());
        assert!(!AuthError::TooManyRequests.is_permanent());
        assert!(!AuthError::Exchange(Status::unavailable("down")).is_permanent());
    }

    #[test]
    fn test_into_status() {
        assert_eq!(Status::from(AuthError::InvalidCredentials).code(), Code::Unauthenticated);
        assert_eq!(Status::from(AuthError::TooManyRequests).code(), Code::ResourceExhausted);

        let status: Status = AuthError::Exchange(Status::unavailable("down")).into();
        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(status.message(), "down");
    }
}
