//! Integration tests for token caching and the auth interceptor

use async_trait::async_trait;
use hub_auth::{
    token_from_metadata, AuthClient, AuthConfig, AuthError, AuthInterceptor, Credentials,
    IssuedToken, TokenIssuer,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::{Request, Status};

/// Issues `token-<n>` on every call, or a fixed failure
struct MockIssuer {
    calls: AtomicU32,
    delay: Duration,
    expires_in: Duration,
    failure: Mutex<Option<Status>>,
}

impl MockIssuer {
    fn new(expires_in: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            delay: Duration::from_millis(20),
            expires_in,
            failure: Mutex::new(None),
        })
    }

    fn failing(status: Status) -> Arc<Self> {
        let issuer = Self::new(Duration::from_secs(3600));
        *issuer.failure.lock().unwrap() = Some(status);
        issuer
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenIssuer for MockIssuer {
    async fn issue_access_token(
        &self,
        credentials: &Credentials,
        _timeout: Duration,
    ) -> Result<IssuedToken, Status> {
        assert_eq!(credentials.client_id(), "client");
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if let Some(status) = self.failure.lock().unwrap().clone() {
            return Err(status);
        }
        Ok(IssuedToken {
            access_token: format!("token-{}", n),
            expires_in: self.expires_in,
        })
    }
}

fn auth_client(issuer: Arc<MockIssuer>) -> Arc<AuthClient> {
    Arc::new(AuthClient::new(Credentials::new("client", "secret"), issuer))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hub_auth=debug")
        .with_test_writer()
        .try_init();
}

async fn authenticate_concurrently(auth: &Arc<AuthClient>, callers: usize) -> Vec<String> {
    let mut handles = Vec::new();
    for _ in 0..callers {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move { auth.authenticate().await }));
    }

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.push(handle.await.unwrap().unwrap().secret().to_string());
    }
    tokens
}

// ==================== Token cache ====================

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_single_exchange() {
    init_tracing();
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let auth = auth_client(issuer.clone());

    let tokens = authenticate_concurrently(&auth, 50).await;

    assert_eq!(issuer.calls(), 1);
    assert!(tokens.iter().all(|t| t == "token-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_single_exchange_multi_thread() {
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let auth = auth_client(issuer.clone());

    let tokens = authenticate_concurrently(&auth, 100).await;

    assert_eq!(issuer.calls(), 1);
    assert!(tokens.iter().all(|t| t == "token-1"));
}

#[tokio::test(start_paused = true)]
async fn test_expired_token_refreshed_once_under_race() {
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let auth = auth_client(issuer.clone());

    auth.authenticate().await.unwrap();
    tokio::time::advance(Duration::from_secs(3301)).await;

    let tokens = authenticate_concurrently(&auth, 20).await;

    assert_eq!(issuer.calls(), 2);
    assert!(tokens.iter().all(|t| t == "token-2"));
}

#[tokio::test(start_paused = true)]
async fn test_buffered_expiry_scenario() {
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let auth = auth_client(issuer.clone());

    let issued_at = tokio::time::Instant::now();
    let token = auth.authenticate().await.unwrap();
    // The mock sleeps before answering
    let lifetime = token.expiry() - issued_at;
    assert!(lifetime >= Duration::from_secs(3300));
    assert!(lifetime < Duration::from_secs(3301));

    tokio::time::advance(Duration::from_secs(3200)).await;
    assert_eq!(auth.authenticate().await.unwrap().secret(), "token-1");
    assert_eq!(issuer.calls(), 1);

    tokio::time::advance(Duration::from_secs(101)).await;
    assert_eq!(auth.authenticate().await.unwrap().secret(), "token-2");
    assert_eq!(issuer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_short_lifetime_is_not_buffered() {
    let issuer = MockIssuer::new(Duration::from_secs(4 * 60));
    let auth = auth_client(issuer);

    let before = tokio::time::Instant::now();
    let token = auth.authenticate().await.unwrap();
    let lifetime = token.expiry() - before;

    assert!(lifetime >= Duration::from_secs(240));
    assert!(lifetime < Duration::from_secs(241));
}

#[tokio::test(start_paused = true)]
async fn test_custom_expiry_buffer() {
    let issuer = MockIssuer::new(Duration::from_secs(600));
    let auth = AuthClient::with_config(
        Credentials::new("client", "secret"),
        issuer.clone(),
        AuthConfig {
            expiry_buffer: Duration::from_secs(60),
            ..Default::default()
        },
    );

    auth.authenticate().await.unwrap();
    tokio::time::advance(Duration::from_secs(530)).await;
    auth.authenticate().await.unwrap();
    assert_eq!(issuer.calls(), 1);

    tokio::time::advance(Duration::from_secs(20)).await;
    auth.authenticate().await.unwrap();
    assert_eq!(issuer.calls(), 2);
}

// ==================== Permanent failure ====================

#[tokio::test(start_paused = true)]
async fn test_invalid_credentials_are_permanent() {
    init_tracing();
    let issuer = MockIssuer::failing(Status::unauthenticated("bad credentials"));
    let auth = auth_client(issuer.clone());

    let err = auth.authenticate().await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(auth.is_permanently_unauthenticated().await);

    // Even after the server would accept the credentials again
    *issuer.failure.lock().unwrap() = None;
    tokio::time::advance(Duration::from_secs(24 * 3600)).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let auth = auth.clone();
        handles.push(tokio::spawn(async move { auth.authenticate().await }));
    }
    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            Err(AuthError::InvalidCredentials)
        ));
    }

    assert_eq!(issuer.calls(), 1);
    assert_eq!(auth.exchange_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_instance_retries_authentication() {
    let issuer = MockIssuer::failing(Status::unauthenticated("bad credentials"));
    let first = auth_client(issuer.clone());
    assert!(first.authenticate().await.is_err());

    *issuer.failure.lock().unwrap() = None;
    let second = auth_client(issuer.clone());

    assert!(second.authenticate().await.is_ok());
    assert_eq!(issuer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_failures_propagate_and_retry() {
    let issuer = MockIssuer::failing(Status::unavailable("token service down"));
    let auth = auth_client(issuer.clone());

    match auth.authenticate().await {
        Err(AuthError::Exchange(status)) => {
            assert_eq!(status.code(), tonic::Code::Unavailable);
            assert_eq!(status.message(), "token service down");
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(auth.authenticate().await.is_err());
    assert_eq!(issuer.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_keeps_serving_valid_token() {
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let auth = auth_client(issuer.clone());
    auth.authenticate().await.unwrap();

    *issuer.failure.lock().unwrap() = Some(Status::resource_exhausted("slow down"));
    tokio::time::advance(Duration::from_secs(3301)).await;
    assert!(matches!(
        auth.authenticate().await,
        Err(AuthError::TooManyRequests)
    ));

    // Backoff: fail fast, no exchange
    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(matches!(
        auth.authenticate().await,
        Err(AuthError::TooManyRequests)
    ));
    assert_eq!(issuer.calls(), 2);

    *issuer.failure.lock().unwrap() = None;
    tokio::time::advance(Duration::from_secs(300)).await;
    assert_eq!(auth.authenticate().await.unwrap().secret(), "token-3");
}

// ==================== Interceptor ====================

#[tokio::test(start_paused = true)]
async fn test_interceptor_attaches_token() {
    let issuer = MockIssuer::new(Duration::from_secs(3600));
    let interceptor = AuthInterceptor::new(auth_client(issuer));

    let request = interceptor.intercept(Request::new(())).await.unwrap();

    assert_eq!(token_from_metadata(request.metadata()), Some("token-1"));
}

#[tokio::test(start_paused = true)]
async fn test_interceptor_cancels_call_without_token() {
    let issuer = MockIssuer::failing(Status::unauthenticated("bad credentials"));
    let interceptor = AuthInterceptor::new(auth_client(issuer));
    let dispatched = AtomicU32::new(0);

    for _ in 0..3 {
        match interceptor.intercept(Request::new(())).await {
            Ok(_) => {
                dispatched.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => assert!(matches!(err, AuthError::InvalidCredentials)),
        }
    }

    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interceptor_surfaces_rate_limit() {
    let issuer = MockIssuer::failing(Status::resource_exhausted("slow down"));
    let interceptor = AuthInterceptor::new(auth_client(issuer));

    let err = interceptor.intercept(Request::new(())).await.unwrap_err();
    assert!(matches!(err, AuthError::TooManyRequests));
}

#[tokio::test(start_paused = true)]
async fn test_interceptor_rejects_unencodable_token() {
    struct NewlineIssuer;

    #[async_trait]
    impl TokenIssuer for NewlineIssuer {
        async fn issue_access_token(
            &self,
            _credentials: &Credentials,
            _timeout: Duration,
        ) -> Result<IssuedToken, Status> {
            Ok(IssuedToken {
                access_token: "bad\ntoken".to_string(),
                expires_in: Duration::from_secs(3600),
            })
        }
    }

    let auth = Arc::new(AuthClient::new(
        Credentials::new("client", "secret"),
        Arc::new(NewlineIssuer),
    ));
    let interceptor = AuthInterceptor::new(auth);

    let err = interceptor.intercept(Request::new(())).await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken));
}
