//! Cerbos Hub store client
//!
//! Store operations run through a circuit breaker and an auth interceptor, and every failure is
//! classified into a [`StoreError`] carrying the diagnostics the server attached.
//!
//! ```rust,no_run
//! use hub_store::{HubClientBuilder, HubError, ModifyFilesRequest, Reason};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HubClientBuilder::from_env()?.build()?;
//! let store = client.store_client();
//!
//! let request = ModifyFilesRequest::new("MWPKEMFX3CK1", "add policy")
//!     .add_or_update_file("policy.yaml", std::fs::read("policy.yaml")?)
//!     .store_version_must_equal(41);
//!
//! match store.modify_files(request).await {
//!     Ok(response) => println!("new version {}", response.new_store_version),
//!     Err(HubError::Store(err)) if err.reason() == Reason::ConditionUnsatisfied => {
//!         println!("store moved on to {:?}", err.current_store_version());
//!     }
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod details;
pub mod error;
pub mod files;
pub mod proto;
mod requests;
pub mod transport;

pub use builder::{HubClient, HubClientBuilder};
pub use client::StoreClient;
pub use config::HubConfig;
pub use details::ErrorDetail;
pub use error::{
    classify, CallFailure, ConfigError, DirectoryError, HubError, Reason, StoreError,
};
pub use files::{
    files_from_directory, upload_files_from_directory, zip_directory, MODIFY_FILES_BATCH_SIZE,
};
pub use proto::{
    ChangeDetails, File, FileError, GetFilesRequest, GetFilesResponse, ListFilesRequest,
    ListFilesResponse, ModifyFilesRequest, ModifyFilesResponse, ReplaceFilesRequest,
    ReplaceFilesResponse,
};
pub use requests::DEFAULT_UPLOADER;
pub use transport::{GrpcStoreTransport, StoreTransport};
