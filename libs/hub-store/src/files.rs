//! Policy files from a local directory
//!
//! Hidden entries (names starting with `.`) are skipped together with everything below them, and
//! only `.yaml`, `.yml` and `.json` files are picked up. Store paths are relative to the directory
//! and always use `/` separators.

use crate::error::DirectoryError;
use crate::proto::{File, ModifyFilesRequest};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files carried by each request built by [`upload_files_from_directory`]
pub const MODIFY_FILES_BATCH_SIZE: usize = 25;

const POLICY_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// In-memory zip archive of `path`, suitable for
/// [`ReplaceFilesRequest::with_zipped_contents`](crate::ReplaceFilesRequest::with_zipped_contents).
///
/// A directory contributes its visible subdirectories and policy files; a single file is stored
/// under its own name.
pub fn zip_directory(path: impl AsRef<Path>) -> Result<Vec<u8>, DirectoryError> {
    let path = path.as_ref();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    if path.is_file() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(path)?)?;
    } else {
        let entries = WalkDir::new(path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry));

        for entry in entries {
            let entry = entry?;
            let name = store_path(path, entry.path());
            if entry.file_type().is_dir() {
                zip.add_directory(name, options)?;
            } else if is_policy_file(&entry) {
                zip.start_file(name, options)?;
                zip.write_all(&fs::read(entry.path())?)?;
            }
        }
    }

    Ok(zip.finish()?.into_inner())
}

/// Policy files under `dir` for
/// [`ReplaceFilesRequest::with_files`](crate::ReplaceFilesRequest::with_files); empty files are
/// left out.
pub fn files_from_directory(dir: impl AsRef<Path>) -> Result<Vec<File>, DirectoryError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in policy_files(dir) {
        let entry = entry?;
        let contents = fs::read(entry.path())?;
        if !contents.is_empty() {
            files.push(File::new(store_path(dir, entry.path()), contents));
        }
    }

    Ok(files)
}

/// Upload every policy file under `dir` as a series of `ModifyFiles` requests of at most
/// [`MODIFY_FILES_BATCH_SIZE`] files each.
pub fn upload_files_from_directory(
    store_id: &str,
    message: &str,
    dir: impl AsRef<Path>,
) -> Result<Vec<ModifyFilesRequest>, DirectoryError> {
    let dir = dir.as_ref();
    let entries = policy_files(dir).collect::<Result<Vec<_>, _>>()?;

    entries
        .chunks(MODIFY_FILES_BATCH_SIZE)
        .map(|batch| {
            batch.iter().try_fold(
                ModifyFilesRequest::new(store_id, message),
                |request, entry| -> Result<_, DirectoryError> {
                    let contents = fs::read(entry.path())?;
                    Ok(request.add_or_update_file(store_path(dir, entry.path()), contents))
                },
            )
        })
        .collect()
}

fn policy_files(dir: &Path) -> impl Iterator<Item = Result<DirEntry, walkdir::Error>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter(|entry| match entry {
            Ok(entry) => is_policy_file(entry),
            Err(_) => true,
        })
}

// The root itself is never hidden, even when given as `.` or a dot-directory
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn is_policy_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| POLICY_EXTENSIONS.contains(&ext))
}

fn store_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::file_op;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn policy_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "resource.yaml", "resourcePolicy: {}");
        write(root, "principal.yml", "principalPolicy: {}");
        write(root, "schemas/leave.json", "{}");
        write(root, "README.md", "# docs");
        write(root, "notes.txt", "ignored");
        write(root, ".hidden.yaml", "secret: true");
        write(root, ".git/config.yaml", "core: {}");
        write(root, "derived/.cache/roles.yaml", "derivedRoles: {}");
        dir
    }

    fn paths(files: &[File]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_files_from_directory_filters_hidden_and_extensions() {
        let dir = policy_tree();
        let files = files_from_directory(dir.path()).unwrap();

        assert_eq!(
            paths(&files),
            vec!["principal.yml", "resource.yaml", "schemas/leave.json"]
        );
        assert_eq!(files[1].contents, b"resourcePolicy: {}");
    }

    #[test]
    fn test_files_from_directory_skips_empty_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "empty.yaml", "");
        write(dir.path(), "policy.yaml", "resourcePolicy: {}");

        let files = files_from_directory(dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["policy.yaml"]);
    }

    #[test]
    fn test_zip_directory_contents() {
        let dir = policy_tree();
        let bytes = zip_directory(dir.path()).unwrap();

        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();

        assert_eq!(
            names,
            vec![
                "derived/",
                "principal.yml",
                "resource.yaml",
                "schemas/",
                "schemas/leave.json"
            ]
        );
    }

    #[test]
    fn test_zip_single_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "policy.yaml", "resourcePolicy: {}");

        let bytes = zip_directory(dir.path().join("policy.yaml")).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["policy.yaml"]);
    }

    #[test]
    fn test_zip_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = zip_directory(dir.path().join("missing"));
        assert!(matches!(result, Err(DirectoryError::Walk(_))));
    }

    #[test]
    fn test_upload_batches_of_twenty_five() {
        let dir = TempDir::new().unwrap();
        for i in 0..60 {
            write(dir.path(), &format!("policies/p{:02}.yaml", i), "resourcePolicy: {}");
        }
        write(dir.path(), "policies/.draft.yaml", "resourcePolicy: {}");
        write(dir.path(), "policies/notes.md", "skip me");

        let requests = upload_files_from_directory("store", "sync", dir.path()).unwrap();

        let sizes: Vec<usize> = requests.iter().map(|r| r.operations.len()).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
        assert!(requests.iter().all(|r| r.store_id == "store"));
        assert_eq!(
            requests[0].change_details.as_ref().unwrap().description,
            "sync"
        );

        match &requests[2].operations[9].op {
            Some(file_op::Op::AddOrUpdate(file)) => assert_eq!(file.path, "policies/p59.yaml"),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_upload_empty_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "nothing to upload");

        assert!(upload_files_from_directory("store", "sync", dir.path())
            .unwrap()
            .is_empty());
    }
}
