//! Token exchange transport
//!
//! [`TokenIssuer`] is the seam between [`AuthClient`](crate::AuthClient) and the network.
//! [`GrpcTokenIssuer`] performs the unary `IssueAccessToken` call over a tonic channel; tests
//! plug in their own implementation.

use crate::credentials::Credentials;
use async_trait::async_trait;
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{GrpcMethod, IntoRequest, Status};

const SERVICE: &str = "cerbos.cloud.apikey.v1.ApiKeyService";
const ISSUE_ACCESS_TOKEN_PATH: &str = "/cerbos.cloud.apikey.v1.ApiKeyService/IssueAccessToken";

/// Wire messages of the API key service
pub mod proto {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IssueAccessTokenRequest {
        #[prost(string, tag = "1")]
        pub client_id: ::prost::alloc::string::String,
        #[prost(string, tag = "2")]
        pub client_secret: ::prost::alloc::string::String,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct IssueAccessTokenResponse {
        #[prost(string, tag = "1")]
        pub access_token: ::prost::alloc::string::String,
        #[prost(message, optional, tag = "2")]
        pub expires_in: ::core::option::Option<::prost_types::Duration>,
    }
}

/// Result of a successful token exchange
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime reported by the server
    pub expires_in: Duration,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Performs the client-credentials exchange
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Exchange credentials for a bearer token. `timeout` is the deadline carried by the call.
    async fn issue_access_token(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<IssuedToken, Status>;
}

/// [`TokenIssuer`] backed by the API key gRPC service
#[derive(Clone)]
pub struct GrpcTokenIssuer {
    inner: Grpc<Channel>,
}

impl GrpcTokenIssuer {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }
}

#[async_trait]
impl TokenIssuer for GrpcTokenIssuer {
    async fn issue_access_token(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<IssuedToken, Status> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("Token service was not ready: {}", e)))?;

        let mut request = proto::IssueAccessTokenRequest {
            client_id: credentials.client_id().to_string(),
            client_secret: credentials.client_secret().to_string(),
        }
        .into_request();
        request.set_timeout(timeout);
        request
            .extensions_mut()
            .insert(GrpcMethod::new(SERVICE, "IssueAccessToken"));

        let codec: ProstCodec<proto::IssueAccessTokenRequest, proto::IssueAccessTokenResponse> =
            ProstCodec::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(ISSUE_ACCESS_TOKEN_PATH), codec)
            .await?
            .into_inner();

        Ok(IssuedToken {
            access_token: response.access_token,
            expires_in: expires_in(response.expires_in),
        })
    }
}

/// Whole seconds of the reported lifetime; missing or negative values become zero
fn expires_in(duration: Option<prost_types::Duration>) -> Duration {
    duration
        .map(|d| Duration::from_secs(u64::try_from(d.seconds).unwrap_or(0)))
        .unwrap_or(Duration::ZERO)
}
