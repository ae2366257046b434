//! Store operations
//!
//! Every operation runs through [`StoreClient::execute`]: the circuit breaker admits the call, the
//! auth interceptor attaches a token (or cancels the call), the request is sent with a deadline,
//! and any failure is classified into a [`StoreError`].

use crate::error::{classify, CallFailure, HubError, StoreError};
use crate::proto::{
    GetFilesRequest, GetFilesResponse, ListFilesRequest, ListFilesResponse, ModifyFilesRequest,
    ModifyFilesResponse, ReplaceFilesRequest, ReplaceFilesResponse,
};
use crate::transport::StoreTransport;
use hub_auth::AuthInterceptor;
use resilience::{with_timeout, CircuitBreaker, CircuitBreakerError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tonic::{Request, Status};
use tracing::debug;

#[derive(Clone)]
pub struct StoreClient {
    transport: Arc<dyn StoreTransport>,
    interceptor: AuthInterceptor,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl StoreClient {
    pub fn new(
        transport: Arc<dyn StoreTransport>,
        interceptor: AuthInterceptor,
        breaker: CircuitBreaker,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            interceptor,
            breaker,
            timeout,
        }
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Replace the entire contents of a store
    pub async fn replace_files(
        &self,
        request: ReplaceFilesRequest,
    ) -> Result<ReplaceFilesResponse, HubError> {
        precheck(request.check())?;
        self.execute("ReplaceFiles", request, |r| self.transport.replace_files(r))
            .await
    }

    /// Like [`replace_files`](Self::replace_files), but a discarded no-op upload succeeds with
    /// the current store version
    pub async fn replace_files_lenient(
        &self,
        request: ReplaceFilesRequest,
    ) -> Result<ReplaceFilesResponse, HubError> {
        match self.replace_files(request).await {
            Err(HubError::Store(StoreError::OperationDiscarded {
                current_store_version,
                ..
            })) => Ok(ReplaceFilesResponse {
                new_store_version: current_store_version,
                ignored_files: Vec::new(),
            }),
            other => other,
        }
    }

    /// Add, update or delete individual files
    pub async fn modify_files(
        &self,
        request: ModifyFilesRequest,
    ) -> Result<ModifyFilesResponse, HubError> {
        precheck(request.check())?;
        self.execute("ModifyFiles", request, |r| self.transport.modify_files(r))
            .await
    }

    pub async fn modify_files_lenient(
        &self,
        request: ModifyFilesRequest,
    ) -> Result<ModifyFilesResponse, HubError> {
        match self.modify_files(request).await {
            Err(HubError::Store(StoreError::OperationDiscarded {
                current_store_version,
                ..
            })) => Ok(ModifyFilesResponse {
                new_store_version: current_store_version,
            }),
            other => other,
        }
    }

    pub async fn list_files(
        &self,
        request: ListFilesRequest,
    ) -> Result<ListFilesResponse, HubError> {
        precheck(request.check())?;
        self.execute("ListFiles", request, |r| self.transport.list_files(r))
            .await
    }

    pub async fn get_files(&self, request: GetFilesRequest) -> Result<GetFilesResponse, HubError> {
        precheck(request.check())?;
        self.execute("GetFiles", request, |r| self.transport.get_files(r))
            .await
    }

    /// Run one call under the breaker, interceptor and deadline, classifying any failure
    pub async fn execute<Req, Resp, F, Fut>(
        &self,
        operation: &'static str,
        message: Req,
        dispatch: F,
    ) -> Result<Resp, HubError>
    where
        F: FnOnce(Request<Req>) -> Fut,
        Fut: Future<Output = Result<Resp, Status>>,
    {
        let result = self
            .breaker
            .call_with(
                move || async move {
                    let mut request = self.interceptor.intercept(Request::new(message)).await?;
                    request.set_timeout(self.timeout);

                    match with_timeout(self.timeout, dispatch(request)).await {
                        Ok(response) => response.map_err(CallFailure::Status),
                        Err(elapsed) => Err(CallFailure::Status(Status::deadline_exceeded(
                            elapsed.to_string(),
                        ))),
                    }
                },
                CallFailure::counts_against_breaker,
            )
            .await;

        match result {
            Ok(response) => Ok(response),
            Err(CircuitBreakerError::Open) => {
                debug!(operation, breaker = self.breaker.name(), "Store call rejected: circuit open");
                Err(HubError::CircuitOpen)
            }
            Err(CircuitBreakerError::Inner(failure)) => {
                let err = classify(failure);
                debug!(operation, reason = %err.reason(), error = %err, "Store call failed");
                Err(HubError::Store(err))
            }
        }
    }
}

fn precheck(check: Result<(), String>) -> Result<(), HubError> {
    check.map_err(|message| HubError::Store(classify(CallFailure::InvalidRequest(message))))
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("breaker", &self.breaker.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
