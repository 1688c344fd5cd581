//! Data file discovery
//!
//! Fixture files live in a conventionally named `data/` directory under one
//! or more resource roots:
//!
//! ```text
//! <root>/
//!   data/
//!     users.json      -> collection "users"
//!     orders.json     -> collection "orders"
//! ```
//!
//! Every root is scanned in order and the results are merged, so a later
//! root can shadow a file of the same name from an earlier one.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default name of the directory holding fixture files
pub const DEFAULT_DATA_DIR: &str = "data";

/// Error type for data file access
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Enumerating a data directory failed
    #[error("Failed to list data directory {}: {source}", dir.display())]
    ListFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a data file failed
    #[error("Failed to read data file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fixture file found by a [`FileLister`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    name: String,
    path: PathBuf,
}

impl DataFile {
    /// Create a data file entry
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Base file name, without directory and extension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Collection this file is imported into (the base name, verbatim)
    pub fn collection_name(&self) -> &str {
        &self.name
    }

    /// Location of the file content
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full file content
    ///
    /// The file handle is closed before this returns.
    pub async fn read(&self) -> StorageResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| StorageError::ReadFailed {
                path: self.path.clone(),
                source,
            })
    }
}

/// Source of fixture files keyed by base name
#[async_trait]
pub trait FileLister: Send + Sync {
    /// List every file with the given extension
    ///
    /// # Arguments
    /// * `extension` - Extension without the leading dot, e.g. `"json"`
    ///
    /// # Returns
    /// Files keyed by base name. When two files share a base name the one
    /// seen last wins.
    async fn list_files(&self, extension: &str) -> StorageResult<BTreeMap<String, DataFile>>;
}

/// Lists `<root>/<data_dir>/*.<extension>` across resource roots
#[derive(Debug, Clone)]
pub struct ResourceDirLister {
    roots: Vec<PathBuf>,
    data_dir: String,
}

impl Default for ResourceDirLister {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}

impl ResourceDirLister {
    /// Scan the `data/` directory of each root
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            data_dir: DEFAULT_DATA_DIR.to_string(),
        }
    }

    /// Scan a single root
    pub fn single(root: impl Into<PathBuf>) -> Self {
        Self::new(vec![root.into()])
    }

    /// Use a different data directory name
    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Resource roots, in scan order
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    async fn scan_dir(
        &self,
        dir: &Path,
        suffix: &str,
        files: &mut BTreeMap<String, DataFile>,
    ) -> StorageResult<()> {
        let list_error = |source| StorageError::ListFailed {
            dir: dir.to_path_buf(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(list_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(list_error)? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                warn!("Skipping data file with a non UTF-8 name: {}", entry.path().display());
                continue;
            };
            if !file_name.ends_with(suffix) {
                continue;
            }

            let path = entry.path();
            let metadata = tokio::fs::metadata(&path).await.map_err(list_error)?;
            if !metadata.is_file() {
                continue;
            }

            let Some(name) = base_name(file_name) else {
                warn!("Skipping data file without a base name: {}", path.display());
                continue;
            };

            if let Some(previous) = files.insert(name.to_string(), DataFile::new(name, &path)) {
                warn!(
                    "Data file {} shadows {} for collection '{}'",
                    path.display(),
                    previous.path().display(),
                    name
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileLister for ResourceDirLister {
    async fn list_files(&self, extension: &str) -> StorageResult<BTreeMap<String, DataFile>> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let mut files = BTreeMap::new();

        for root in &self.roots {
            let dir = root.join(&self.data_dir);
            match tokio::fs::metadata(&dir).await {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => {
                    debug!("{} is not a directory, skipping", dir.display());
                    continue;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("No data directory at {}", dir.display());
                    continue;
                }
                Err(source) => return Err(StorageError::ListFailed { dir, source }),
            }

            self.scan_dir(&dir, &suffix, &mut files).await?;
        }

        Ok(files)
    }
}

/// File name up to its first `.`, or `None` when that is empty
pub fn base_name(file_name: &str) -> Option<&str> {
    let name = file_name.split('.').next().unwrap_or_default();
    if name.is_empty() { None } else { Some(name) }
}
