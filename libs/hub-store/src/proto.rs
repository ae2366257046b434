//! Wire messages of the Cerbos Hub store service
//!
//! Declared by hand with prost derives so the crate needs no protoc at build time.

use std::collections::HashMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct File {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bytes = "vec", tag = "2")]
    pub contents: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChangeDetails {
    #[prost(string, tag = "1")]
    pub description: String,
    #[prost(message, optional, tag = "4")]
    pub uploader: Option<change_details::Uploader>,
    #[prost(oneof = "change_details::Origin", tags = "2, 3")]
    pub origin: Option<change_details::Origin>,
}

pub mod change_details {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Git {
        #[prost(string, tag = "1")]
        pub repo: String,
        #[prost(string, tag = "2")]
        pub r#ref: String,
        #[prost(string, tag = "3")]
        pub hash: String,
        #[prost(string, tag = "4")]
        pub message: String,
        #[prost(string, tag = "5")]
        pub committer: String,
        #[prost(message, optional, tag = "6")]
        pub commit_date: Option<prost_types::Timestamp>,
        #[prost(string, tag = "7")]
        pub author: String,
        #[prost(message, optional, tag = "8")]
        pub author_date: Option<prost_types::Timestamp>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Internal {
        #[prost(string, tag = "1")]
        pub source: String,
        #[prost(map = "string, message", tag = "2")]
        pub metadata: HashMap<String, prost_types::Value>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Uploader {
        #[prost(string, tag = "1")]
        pub name: String,
        #[prost(map = "string, message", tag = "2")]
        pub metadata: HashMap<String, prost_types::Value>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Origin {
        #[prost(message, tag = "2")]
        Git(Git),
        #[prost(message, tag = "3")]
        Internal(Internal),
    }
}

/// Optimistic-concurrency guard on a write
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Condition {
    #[prost(int64, tag = "1")]
    pub store_version_must_equal: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplaceFilesRequest {
    #[prost(string, tag = "1")]
    pub store_id: String,
    #[prost(message, optional, tag = "2")]
    pub condition: Option<Condition>,
    #[prost(message, optional, tag = "5")]
    pub change_details: Option<ChangeDetails>,
    #[prost(oneof = "replace_files_request::Contents", tags = "3, 4")]
    pub contents: Option<replace_files_request::Contents>,
}

pub mod replace_files_request {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Files {
        #[prost(message, repeated, tag = "1")]
        pub files: Vec<File>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Contents {
        #[prost(bytes, tag = "3")]
        ZippedContents(Vec<u8>),
        #[prost(message, tag = "4")]
        Files(Files),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReplaceFilesResponse {
    #[prost(int64, tag = "1")]
    pub new_store_version: i64,
    #[prost(string, repeated, tag = "2")]
    pub ignored_files: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileOp {
    #[prost(oneof = "file_op::Op", tags = "1, 2")]
    pub op: Option<file_op::Op>,
}

pub mod file_op {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(message, tag = "1")]
        AddOrUpdate(File),
        #[prost(string, tag = "2")]
        Delete(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModifyFilesRequest {
    #[prost(string, tag = "1")]
    pub store_id: String,
    #[prost(message, optional, tag = "2")]
    pub condition: Option<Condition>,
    #[prost(message, repeated, tag = "3")]
    pub operations: Vec<FileOp>,
    #[prost(message, optional, tag = "4")]
    pub change_details: Option<ChangeDetails>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ModifyFilesResponse {
    #[prost(int64, tag = "1")]
    pub new_store_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringMatch {
    #[prost(oneof = "string_match::Match", tags = "1, 2, 3")]
    pub r#match: Option<string_match::Match>,
}

pub mod string_match {
    use super::*;

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InList {
        #[prost(string, repeated, tag = "1")]
        pub values: Vec<String>,
    }

    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Match {
        #[prost(string, tag = "1")]
        Equals(String),
        #[prost(string, tag = "2")]
        Like(String),
        #[prost(message, tag = "3")]
        In(InList),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileFilter {
    #[prost(message, optional, tag = "1")]
    pub path: Option<StringMatch>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFilesRequest {
    #[prost(string, tag = "1")]
    pub store_id: String,
    #[prost(message, optional, tag = "2")]
    pub filter: Option<FileFilter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFilesResponse {
    #[prost(int64, tag = "1")]
    pub store_version: i64,
    #[prost(string, repeated, tag = "2")]
    pub files: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetFilesRequest {
    #[prost(string, tag = "1")]
    pub store_id: String,
    #[prost(string, repeated, tag = "2")]
    pub files: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetFilesResponse {
    #[prost(int64, tag = "1")]
    pub store_version: i64,
    #[prost(message, repeated, tag = "2")]
    pub files: Vec<File>,
}

// Structured error details

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileError {
    #[prost(string, tag = "1")]
    pub file: String,
    #[prost(enumeration = "file_error::Cause", tag = "2")]
    pub cause: i32,
    #[prost(string, tag = "3")]
    pub details: String,
}

pub mod file_error {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Cause {
        Unspecified = 0,
        InvalidFilePath = 1,
        UnsupportedFileExtension = 2,
        InvalidFileContents = 3,
        DuplicateFilePath = 4,
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ErrDetailCannotModifyGitConnectedStore {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ErrDetailConditionUnsatisfied {
    #[prost(int64, tag = "1")]
    pub current_store_version: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrDetailNoUsableFiles {
    #[prost(string, repeated, tag = "1")]
    pub ignored_files: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrDetailOperationDiscarded {
    #[prost(int64, tag = "1")]
    pub current_store_version: i64,
    #[prost(string, repeated, tag = "2")]
    pub ignored_files: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrDetailValidationFailure {
    #[prost(message, repeated, tag = "1")]
    pub errors: Vec<FileError>,
}

/// `google.rpc.Status`, carried in the `grpc-status-details-bin` trailer
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(message, repeated, tag = "3")]
    pub details: Vec<prost_types::Any>,
}
