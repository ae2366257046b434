//! Client-credentials authentication for Cerbos Hub calls
//!
//! - [`Credentials`]: client id and secret
//! - [`AccessToken`]: bearer token with an absolute expiry
//! - [`AuthClient`]: caches the token, refreshes it ahead of expiry with a single exchange per
//!   expiry, and stops exchanging for good once the credentials are rejected
//! - [`AuthInterceptor`]: attaches the token to outgoing requests or cancels them
//! - [`TokenIssuer`]: the exchange transport, [`GrpcTokenIssuer`] in production
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hub_auth::{AuthClient, AuthInterceptor, Credentials, GrpcTokenIssuer};
//! use std::sync::Arc;
//! use tonic::transport::Channel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = Channel::from_static("https://api.cerbos.cloud").connect_lazy();
//! let auth = Arc::new(AuthClient::new(
//!     Credentials::new("client-id", "client-secret"),
//!     Arc::new(GrpcTokenIssuer::new(channel)),
//! ));
//!
//! let interceptor = AuthInterceptor::new(auth);
//! let request = interceptor.intercept(tonic::Request::new(())).await?;
//! # let _ = request;
//! # Ok(())
//! # }
//! ```

mod client;
mod credentials;
mod error;
mod interceptor;
pub mod issuer;
mod token;

pub use client::{AuthClient, AuthConfig};
pub use credentials::Credentials;
pub use error::AuthError;
pub use interceptor::{token_from_metadata, AuthInterceptor, AUTH_HEADER};
pub use issuer::{GrpcTokenIssuer, IssuedToken, TokenIssuer};
pub use token::{buffered_lifetime, deadline_after, AccessToken, MAX_LIFETIME};
