//! Per-call authentication hook
//!
//! tonic's `Interceptor` is synchronous and cannot wait on a token refresh, so the hook is an
//! async function the call site awaits before dispatching the request.

use crate::client::AuthClient;
use crate::error::AuthError;
use std::sync::Arc;
use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::Request;
use tracing::debug;

/// Metadata key carrying the bearer token
pub const AUTH_HEADER: &str = "x-cerbos-auth";

/// Attaches a valid token to every outgoing request
///
/// If no token can be obtained the request is returned as an error instead and must not be sent.
#[derive(Clone, Debug)]
pub struct AuthInterceptor {
    auth: Arc<AuthClient>,
}

impl AuthInterceptor {
    pub fn new(auth: Arc<AuthClient>) -> Self {
        Self { auth }
    }

    pub fn auth_client(&self) -> &Arc<AuthClient> {
        &self.auth
    }

    pub async fn intercept<T>(&self, mut request: Request<T>) -> Result<Request<T>, AuthError> {
        let token = self.auth.authenticate().await.map_err(|err| {
            debug!(error = %err, "Cancelling call: no access token");
            err
        })?;

        let mut value =
            AsciiMetadataValue::try_from(token.secret()).map_err(|_| AuthError::MalformedToken)?;
        value.set_sensitive(true);
        request.metadata_mut().insert(AUTH_HEADER, value);

        Ok(request)
    }
}

/// Token attached by [`AuthInterceptor`], if any
pub fn token_from_metadata(metadata: &MetadataMap) -> Option<&str> {
    metadata.get(AUTH_HEADER)?.to_str().ok()
}
