//! Request construction helpers and the minimal local checks run before a call is attempted

use crate::proto::{
    change_details, file_op, replace_files_request, string_match, ChangeDetails, Condition, File,
    FileFilter, FileOp, GetFilesRequest, GetFilesResponse, ListFilesRequest, ModifyFilesRequest,
    ReplaceFilesRequest, StringMatch,
};

/// Uploader recorded on changes made through this client
pub const DEFAULT_UPLOADER: &str = "cerbos-hub-rs";

impl ChangeDetails {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            uploader: Some(change_details::Uploader {
                name: DEFAULT_UPLOADER.to_string(),
                metadata: Default::default(),
            }),
            origin: None,
        }
    }

    pub fn with_uploader(mut self, name: impl Into<String>) -> Self {
        self.uploader = Some(change_details::Uploader {
            name: name.into(),
            metadata: Default::default(),
        });
        self
    }

    /// Mutually exclusive with [`with_internal_source`](Self::with_internal_source)
    pub fn with_git_source(mut self, git: change_details::Git) -> Self {
        self.origin = Some(change_details::Origin::Git(git));
        self
    }

    pub fn with_internal_source(mut self, internal: change_details::Internal) -> Self {
        self.origin = Some(change_details::Origin::Internal(internal));
        self
    }
}

impl File {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

impl ReplaceFilesRequest {
    /// Replace the store contents with a zip archive
    pub fn with_zipped_contents(
        store_id: impl Into<String>,
        message: impl Into<String>,
        zipped: Vec<u8>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            condition: None,
            change_details: Some(ChangeDetails::new(message)),
            contents: Some(replace_files_request::Contents::ZippedContents(zipped)),
        }
    }

    /// Replace the store contents with the given files
    pub fn with_files(
        store_id: impl Into<String>,
        message: impl Into<String>,
        files: impl IntoIterator<Item = File>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            condition: None,
            change_details: Some(ChangeDetails::new(message)),
            contents: Some(replace_files_request::Contents::Files(
                replace_files_request::Files {
                    files: files.into_iter().collect(),
                },
            )),
        }
    }

    pub fn store_version_must_equal(mut self, version: i64) -> Self {
        self.condition = Some(Condition {
            store_version_must_equal: version,
        });
        self
    }

    pub fn change_details(mut self, details: ChangeDetails) -> Self {
        self.change_details = Some(details);
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        check_store_id(&self.store_id)?;
        match &self.contents {
            Some(replace_files_request::Contents::ZippedContents(zip)) if !zip.is_empty() => Ok(()),
            Some(replace_files_request::Contents::Files(files)) if !files.files.is_empty() => {
                Ok(())
            }
            _ => Err("no files to upload".to_string()),
        }
    }
}

impl ModifyFilesRequest {
    pub fn new(store_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            condition: None,
            operations: Vec::new(),
            change_details: Some(ChangeDetails::new(message)),
        }
    }

    pub fn add_or_update_file(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.operations.push(FileOp {
            op: Some(file_op::Op::AddOrUpdate(File::new(path, contents))),
        });
        self
    }

    pub fn delete_file(mut self, path: impl Into<String>) -> Self {
        self.operations.push(FileOp {
            op: Some(file_op::Op::Delete(path.into())),
        });
        self
    }

    pub fn store_version_must_equal(mut self, version: i64) -> Self {
        self.condition = Some(Condition {
            store_version_must_equal: version,
        });
        self
    }

    pub fn change_details(mut self, details: ChangeDetails) -> Self {
        self.change_details = Some(details);
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        check_store_id(&self.store_id)?;
        if self.operations.is_empty() {
            return Err("no file operations".to_string());
        }
        Ok(())
    }
}

impl ListFilesRequest {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            filter: None,
        }
    }

    pub fn path_must_equal(self, path: impl Into<String>) -> Self {
        self.with_path_match(string_match::Match::Equals(path.into()))
    }

    pub fn path_must_be_like(self, pattern: impl Into<String>) -> Self {
        self.with_path_match(string_match::Match::Like(pattern.into()))
    }

    pub fn path_must_be_in(self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.with_path_match(string_match::Match::In(string_match::InList {
            values: paths.into_iter().map(Into::into).collect(),
        }))
    }

    fn with_path_match(mut self, path_match: string_match::Match) -> Self {
        self.filter = Some(FileFilter {
            path: Some(StringMatch {
                r#match: Some(path_match),
            }),
        });
        self
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        check_store_id(&self.store_id)
    }
}

impl GetFilesRequest {
    pub fn new(
        store_id: impl Into<String>,
        paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            files: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        check_store_id(&self.store_id)?;
        if self.files.is_empty() {
            return Err("no file paths requested".to_string());
        }
        Ok(())
    }
}

impl GetFilesResponse {
    /// Contents of `path`, if it was returned
    pub fn file(&self, path: &str) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.contents.as_slice())
    }
}

fn check_store_id(store_id: &str) -> Result<(), String> {
    if store_id.trim().is_empty() {
        return Err("store id is required".to_string());
    }
    Ok(())
}
