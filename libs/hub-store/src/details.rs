//! Structured error details attached to store failures
//!
//! A failed call may carry a `google.rpc.Status` in its `grpc-status-details-bin` trailer, whose
//! `details` are type-tagged `Any` payloads. Each known type URL maps to a decode function in
//! [`REGISTRY`]; anything else becomes [`ErrorDetail::Unknown`]. Decoding never fails: a known
//! marker with an undecodable payload keeps its variant with a `None` payload.

use crate::proto::{
    ErrDetailCannotModifyGitConnectedStore, ErrDetailConditionUnsatisfied, ErrDetailNoUsableFiles,
    ErrDetailOperationDiscarded, ErrDetailValidationFailure, RpcStatus,
};
use prost::Message;
use prost_types::Any;
use tonic::codegen::Bytes;
use tonic::{Code, Status};

const TYPE_URL_PREFIX: &str = "type.googleapis.com/cerbos.cloud.store.v1.";

pub const CANNOT_MODIFY_GIT_CONNECTED_STORE: &str =
    "type.googleapis.com/cerbos.cloud.store.v1.ErrDetailCannotModifyGitConnectedStore";
pub const CONDITION_UNSATISFIED: &str =
    "type.googleapis.com/cerbos.cloud.store.v1.ErrDetailConditionUnsatisfied";
pub const NO_USABLE_FILES: &str = "type.googleapis.com/cerbos.cloud.store.v1.ErrDetailNoUsableFiles";
pub const OPERATION_DISCARDED: &str =
    "type.googleapis.com/cerbos.cloud.store.v1.ErrDetailOperationDiscarded";
pub const VALIDATION_FAILURE: &str =
    "type.googleapis.com/cerbos.cloud.store.v1.ErrDetailValidationFailure";

/// One decoded detail payload
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    CannotModifyGitConnectedStore,
    ConditionUnsatisfied(Option<ErrDetailConditionUnsatisfied>),
    NoUsableFiles(Option<ErrDetailNoUsableFiles>),
    OperationDiscarded(Option<ErrDetailOperationDiscarded>),
    ValidationFailure(Option<ErrDetailValidationFailure>),
    /// Payload of a type this client does not know
    Unknown(String),
}

type DecodeFn = fn(&[u8]) -> ErrorDetail;

/// Type URL to decoder
pub static REGISTRY: &[(&str, DecodeFn)] = &[
    (CANNOT_MODIFY_GIT_CONNECTED_STORE, decode_cannot_modify_git_connected_store),
    (CONDITION_UNSATISFIED, decode_condition_unsatisfied),
    (NO_USABLE_FILES, decode_no_usable_files),
    (OPERATION_DISCARDED, decode_operation_discarded),
    (VALIDATION_FAILURE, decode_validation_failure),
];

fn decode_cannot_modify_git_connected_store(_: &[u8]) -> ErrorDetail {
    ErrorDetail::CannotModifyGitConnectedStore
}

fn decode_condition_unsatisfied(bytes: &[u8]) -> ErrorDetail {
    ErrorDetail::ConditionUnsatisfied(ErrDetailConditionUnsatisfied::decode(bytes).ok())
}

fn decode_no_usable_files(bytes: &[u8]) -> ErrorDetail {
    ErrorDetail::NoUsableFiles(ErrDetailNoUsableFiles::decode(bytes).ok())
}

fn decode_operation_discarded(bytes: &[u8]) -> ErrorDetail {
    ErrorDetail::OperationDiscarded(ErrDetailOperationDiscarded::decode(bytes).ok())
}

fn decode_validation_failure(bytes: &[u8]) -> ErrorDetail {
    ErrorDetail::ValidationFailure(ErrDetailValidationFailure::decode(bytes).ok())
}

/// Decode one `Any` payload
pub fn decode(any: &Any) -> ErrorDetail {
    REGISTRY
        .iter()
        .find(|(type_url, _)| *type_url == any.type_url)
        .map(|(_, decode)| decode(&any.value))
        .unwrap_or_else(|| ErrorDetail::Unknown(any.type_url.clone()))
}

/// All details attached to `status`, in order; empty when absent or undecodable
pub fn from_status(status: &Status) -> Vec<ErrorDetail> {
    let raw = status.details();
    if raw.is_empty() {
        return Vec::new();
    }

    match RpcStatus::decode(raw) {
        Ok(rpc_status) => rpc_status.details.iter().map(decode).collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Discarding undecodable status details");
            Vec::new()
        }
    }
}

/// Store detail message that can be packed into an `Any`
pub trait StoreDetail: Message + Sized {
    const NAME: &'static str;

    fn to_any(&self) -> Any {
        Any {
            type_url: format!("{}{}", TYPE_URL_PREFIX, Self::NAME),
            value: self.encode_to_vec(),
        }
    }
}

impl StoreDetail for ErrDetailCannotModifyGitConnectedStore {
    const NAME: &'static str = "ErrDetailCannotModifyGitConnectedStore";
}

impl StoreDetail for ErrDetailConditionUnsatisfied {
    const NAME: &'static str = "ErrDetailConditionUnsatisfied";
}

impl StoreDetail for ErrDetailNoUsableFiles {
    const NAME: &'static str = "ErrDetailNoUsableFiles";
}

impl StoreDetail for ErrDetailOperationDiscarded {
    const NAME: &'static str = "ErrDetailOperationDiscarded";
}

impl StoreDetail for ErrDetailValidationFailure {
    const NAME: &'static str = "ErrDetailValidationFailure";
}

/// Build a status carrying structured details, the way the store service reports them
pub fn status_with_details(code: Code, message: impl Into<String>, details: Vec<Any>) -> Status {
    let message = message.into();
    let rpc_status = RpcStatus {
        code: code as i32,
        message: message.clone(),
        details,
    };
    Status::with_details(code, message, Bytes::from(rpc_status.encode_to_vec()))
}
