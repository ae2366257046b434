//! Store error taxonomy
//!
//! Every failed store call ends up as exactly one [`StoreError`]. [`classify`] turns the raw
//! [`CallFailure`] into it; a call rejected by the circuit breaker never gets that far and is
//! reported as [`HubError::CircuitOpen`] instead.

use crate::details::{self, ErrorDetail};
use crate::proto::FileError;
use hub_auth::AuthError;
use std::fmt;
use thiserror::Error;
use tonic::{Code, Status};

/// Raw outcome of a failed call, before classification
#[derive(Debug, Error)]
pub enum CallFailure {
    /// Rejected locally; never reached the network
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{}", .0.message())]
    Status(#[from] Status),
}

impl CallFailure {
    /// Whether this failure should count against the circuit breaker
    ///
    /// Caller-side conditions and business conflicts are exempt: a cancelled or timed-out call,
    /// an aborted or precondition-failed write, a request rejected locally, and credentials the
    /// client itself cannot use.
    pub fn counts_against_breaker(&self) -> bool {
        match self {
            CallFailure::InvalidRequest(_) => false,
            CallFailure::Auth(AuthError::InvalidCredentials | AuthError::TooManyRequests) => false,
            CallFailure::Auth(AuthError::Exchange(status)) | CallFailure::Status(status) => {
                !is_exempt_code(status.code())
            }
            CallFailure::Auth(AuthError::MalformedToken) => true,
        }
    }
}

fn is_exempt_code(code: Code) -> bool {
    matches!(
        code,
        Code::Aborted | Code::Cancelled | Code::DeadlineExceeded | Code::FailedPrecondition
    )
}

/// Reason tag of a [`StoreError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    AuthenticationFailed,
    CannotModifyGitConnectedStore,
    ConditionUnsatisfied,
    InvalidRequest,
    NoUsableFiles,
    OperationDiscarded,
    PermissionDenied,
    StoreNotFound,
    TooManyRequests,
    Unknown,
    ValidationFailure,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Reason::CannotModifyGitConnectedStore => "CANNOT_MODIFY_GIT_CONNECTED_STORE",
            Reason::ConditionUnsatisfied => "CONDITION_UNSATISFIED",
            Reason::InvalidRequest => "INVALID_REQUEST",
            Reason::NoUsableFiles => "NO_USABLE_FILES",
            Reason::OperationDiscarded => "OPERATION_DISCARDED",
            Reason::PermissionDenied => "PERMISSION_DENIED",
            Reason::StoreNotFound => "STORE_NOT_FOUND",
            Reason::TooManyRequests => "TOO_MANY_REQUESTS",
            Reason::Unknown => "UNKNOWN",
            Reason::ValidationFailure => "VALIDATION_FAILURE",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified store failure
///
/// Version fields are `-1` when the server attached no usable detail.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("cannot modify a git-connected store: {message}")]
    CannotModifyGitConnectedStore { message: String },

    #[error("condition unsatisfied (current store version {current_store_version}): {message}")]
    ConditionUnsatisfied {
        current_store_version: i64,
        message: String,
    },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("no usable files ({} ignored): {message}", ignored_files.len())]
    NoUsableFiles {
        ignored_files: Vec<String>,
        message: String,
    },

    #[error("operation discarded (current store version {current_store_version}): {message}")]
    OperationDiscarded {
        current_store_version: i64,
        ignored_files: Vec<String>,
        message: String,
    },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("store not found: {message}")]
    StoreNotFound { message: String },

    #[error("too many requests")]
    TooManyRequests,

    #[error("unknown store error ({code:?}): {message}")]
    Unknown { code: Code, message: String },

    #[error("validation failure ({} file errors): {message}", errors.len())]
    ValidationFailure {
        errors: Vec<FileError>,
        message: String,
    },
}

impl StoreError {
    pub fn reason(&self) -> Reason {
        match self {
            StoreError::AuthenticationFailed => Reason::AuthenticationFailed,
            StoreError::CannotModifyGitConnectedStore { .. } => {
                Reason::CannotModifyGitConnectedStore
            }
            StoreError::ConditionUnsatisfied { .. } => Reason::ConditionUnsatisfied,
            StoreError::InvalidRequest { .. } => Reason::InvalidRequest,
            StoreError::NoUsableFiles { .. } => Reason::NoUsableFiles,
            StoreError::OperationDiscarded { .. } => Reason::OperationDiscarded,
            StoreError::PermissionDenied { .. } => Reason::PermissionDenied,
            StoreError::StoreNotFound { .. } => Reason::StoreNotFound,
            StoreError::TooManyRequests => Reason::TooManyRequests,
            StoreError::Unknown { .. } => Reason::Unknown,
            StoreError::ValidationFailure { .. } => Reason::ValidationFailure,
        }
    }

    pub fn current_store_version(&self) -> Option<i64> {
        match self {
            StoreError::ConditionUnsatisfied {
                current_store_version,
                ..
            }
            | StoreError::OperationDiscarded {
                current_store_version,
                ..
            } => Some(*current_store_version),
            _ => None,
        }
    }

    pub fn ignored_files(&self) -> &[String] {
        match self {
            StoreError::NoUsableFiles { ignored_files, .. }
            | StoreError::OperationDiscarded { ignored_files, .. } => ignored_files,
            _ => &[],
        }
    }

    pub fn validation_errors(&self) -> &[FileError] {
        match self {
            StoreError::ValidationFailure { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Map a raw failure to its [`StoreError`]. Never fails; unrecognised shapes become `Unknown`.
pub fn classify(failure: CallFailure) -> StoreError {
    match failure {
        CallFailure::InvalidRequest(message) => StoreError::InvalidRequest { message },
        CallFailure::Auth(AuthError::InvalidCredentials) => StoreError::AuthenticationFailed,
        CallFailure::Auth(AuthError::TooManyRequests) => StoreError::TooManyRequests,
        CallFailure::Auth(AuthError::MalformedToken) => StoreError::Unknown {
            code: Code::Internal,
            message: AuthError::MalformedToken.to_string(),
        },
        CallFailure::Auth(AuthError::Exchange(status)) | CallFailure::Status(status) => {
            classify_status(&status)
        }
    }
}

fn classify_status(status: &Status) -> StoreError {
    let message = status.message().to_string();

    match status.code() {
        Code::PermissionDenied => return StoreError::PermissionDenied { message },
        Code::NotFound => return StoreError::StoreNotFound { message },
        Code::FailedPrecondition => {
            for detail in details::from_status(status) {
                match detail {
                    ErrorDetail::CannotModifyGitConnectedStore => {
                        return StoreError::CannotModifyGitConnectedStore { message }
                    }
                    ErrorDetail::ConditionUnsatisfied(payload) => {
                        return StoreError::ConditionUnsatisfied {
                            current_store_version: payload
                                .map_or(-1, |p| p.current_store_version),
                            message,
                        }
                    }
                    _ => {}
                }
            }
        }
        Code::InvalidArgument => {
            for detail in details::from_status(status) {
                match detail {
                    ErrorDetail::NoUsableFiles(payload) => {
                        return StoreError::NoUsableFiles {
                            ignored_files: payload.map(|p| p.ignored_files).unwrap_or_default(),
                            message,
                        }
                    }
                    ErrorDetail::ValidationFailure(payload) => {
                        return StoreError::ValidationFailure {
                            errors: payload.map(|p| p.errors).unwrap_or_default(),
                            message,
                        }
                    }
                    _ => {}
                }
            }
            return StoreError::InvalidRequest { message };
        }
        Code::AlreadyExists => {
            for detail in details::from_status(status) {
                if let ErrorDetail::OperationDiscarded(payload) = detail {
                    let (current_store_version, ignored_files) = payload
                        .map(|p| (p.current_store_version, p.ignored_files))
                        .unwrap_or((-1, Vec::new()));
                    return StoreError::OperationDiscarded {
                        current_store_version,
                        ignored_files,
                        message,
                    };
                }
            }
        }
        _ => {}
    }

    StoreError::Unknown {
        code: status.code(),
        message,
    }
}

/// Error returned by store operations
#[derive(Debug, Error)]
pub enum HubError {
    /// Rejected by the circuit breaker without being attempted
    #[error("Circuit breaker is open - failing fast")]
    CircuitOpen,

    #[error("Store RPC failure: {0}")]
    Store(#[from] StoreError),
}

impl HubError {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, HubError::CircuitOpen)
    }

    pub fn as_store_error(&self) -> Option<&StoreError> {
        match self {
            HubError::Store(err) => Some(err),
            HubError::CircuitOpen => None,
        }
    }

    pub fn reason(&self) -> Option<Reason> {
        self.as_store_error().map(StoreError::reason)
    }
}

/// Client construction errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Transport configuration failed: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Invalid circuit breaker configuration: {0}")]
    CircuitBreaker(#[from] resilience::CircuitBreakerConfigError),
}

/// Reading policy files from a local directory failed
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_auth_failures() {
        assert_eq!(
            classify(CallFailure::InvalidRequest("missing store id".into())).reason(),
            Reason::InvalidRequest
        );
        assert_eq!(
            classify(CallFailure::Auth(AuthError::InvalidCredentials)).reason(),
            Reason::AuthenticationFailed
        );
        assert_eq!(
            classify(CallFailure::Auth(AuthError::TooManyRequests)).reason(),
            Reason::TooManyRequests
        );
    }

    #[test]
    fn test_exchange_failure_follows_status_table() {
        let err = classify(CallFailure::Auth(AuthError::Exchange(Status::permission_denied(
            "no",
        ))));
        assert_eq!(err.reason(), Reason::PermissionDenied);

        let err = classify(CallFailure::Auth(AuthError::Exchange(Status::unavailable(
            "down",
        ))));
        assert_eq!(err.reason(), Reason::Unknown);
    }

    #[test]
    fn test_plain_codes() {
        let cases = [
            (Code::PermissionDenied, Reason::PermissionDenied),
            (Code::NotFound, Reason::StoreNotFound),
            (Code::InvalidArgument, Reason::InvalidRequest),
            (Code::FailedPrecondition, Reason::Unknown),
            (Code::AlreadyExists, Reason::Unknown),
            (Code::ResourceExhausted, Reason::Unknown),
            (Code::Unavailable, Reason::Unknown),
            (Code::Internal, Reason::Unknown),
        ];

        for (code, reason) in cases {
            let err = classify(CallFailure::Status(Status::new(code, "boom")));
            assert_eq!(err.reason(), reason, "code {:?}", code);
        }
    }

    #[test]
    fn test_breaker_exemptions() {
        for code in [
            Code::Aborted,
            Code::Cancelled,
            Code::DeadlineExceeded,
            Code::FailedPrecondition,
        ] {
            assert!(!CallFailure::Status(Status::new(code, "")).counts_against_breaker());
            assert!(
                !CallFailure::Auth(AuthError::Exchange(Status::new(code, "")))
                    .counts_against_breaker()
            );
        }

        for code in [Code::Unavailable, Code::Internal, Code::NotFound, Code::Unknown] {
            assert!(CallFailure::Status(Status::new(code, "")).counts_against_breaker());
        }

        assert!(!CallFailure::InvalidRequest("x".into()).counts_against_breaker());
        assert!(!CallFailure::Auth(AuthError::InvalidCredentials).counts_against_breaker());
        assert!(!CallFailure::Auth(AuthError::TooManyRequests).counts_against_breaker());
    }

    #[test]
    fn test_accessors_on_detail_free_errors() {
        let err = StoreError::StoreNotFound {
            message: "gone".into(),
        };

        assert_eq!(err.current_store_version(), None);
        assert!(err.ignored_files().is_empty());
        assert!(err.validation_errors().is_empty());
        assert_eq!(err.reason().to_string(), "STORE_NOT_FOUND");
    }

    #[test]
    fn test_hub_error_reason() {
        assert_eq!(HubError::CircuitOpen.reason(), None);
        assert!(HubError::CircuitOpen.is_circuit_open());

        let err = HubError::from(StoreError::TooManyRequests);
        assert_eq!(err.reason(), Some(Reason::TooManyRequests));
    }
}
