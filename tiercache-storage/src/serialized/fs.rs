//! Filesystem-backed byte store.
//!
//! One file per object, named by the object id, inside a base directory.
//! Writes go to a temporary file first and are renamed into place, so a
//! failed write never leaves a partial object behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tiercache_core::{ObjectId, StorageError};

use super::SerializableStorage;

const TMP_SUFFIX: &str = "tmp";

/// Byte store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    base_directory: PathBuf,
}

impl FileSystemStorage {
    /// Open a store in `base_directory`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// `BadDirectory` if the path exists but is not a directory, or cannot be
    /// created.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self, StorageError> {
        let path = base_directory.as_ref();
        tracing::info!(directory = %path.display(), "Checking storage directory");

        if path.exists() {
            if !path.is_dir() {
                return Err(StorageError::BadDirectory {
                    path: path.display().to_string(),
                    reason: "path exists and is not a directory".to_string(),
                });
            }
        } else {
            fs::create_dir_all(path).map_err(|e| StorageError::BadDirectory {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self {
            base_directory: path.to_path_buf(),
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn path_for(&self, id: ObjectId) -> PathBuf {
        self.base_directory.join(id.hyphenated().to_string())
    }
}

impl SerializableStorage for FileSystemStorage {
    fn store(&self, id: ObjectId, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.path_for(id);
        let tmp = target.with_extension(TMP_SUFFIX);

        let written = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, &target));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::StoreFailed {
                id,
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    fn retrieve(&self, id: ObjectId) -> Result<Vec<u8>, StorageError> {
        fs::read(self.path_for(id)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::DataNotFound { id },
            _ => StorageError::RetrieveFailed {
                id,
                reason: e.to_string(),
            },
        })
    }

    fn delete(&self, id: ObjectId) -> Result<(), StorageError> {
        fs::remove_file(self.path_for(id)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::DataNotFound { id },
            _ => StorageError::DeleteFailed {
                id,
                reason: e.to_string(),
            },
        })
    }

    fn occupied_size(&self) -> u64 {
        let entries = match fs::read_dir(&self.base_directory) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.metadata().ok())
            .filter(|metadata| metadata.is_file())
            .map(|metadata| metadata.len())
            .sum()
    }
}
