//! Import pipeline
//!
//! connect → list `*.json` → (strict) filter by declared collections →
//! import file by file → close.
//!
//! Every failure is fatal. The first error stops the run, the connection is
//! closed if it was opened, and the error names the phase and the file or
//! collection involved. Documents written by files that completed before
//! the failure stay in the database.

pub mod document;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::EntityCatalog;
use crate::config::ImportConfig;
use crate::database::{
    CollectionHandle, DatabaseConnector, DatabaseError, DatabaseHandle, mask_connection_uri,
};
use crate::storage::{DataFile, FileLister, StorageError};

pub use document::{ContentError, parse_documents};

/// Extension of fixture files
pub const DATA_FILE_EXTENSION: &str = "json";

/// Error surfaced by an import run
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Missing or unusable configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The database could not be reached (or released)
    #[error("Failed to connect to the database: {0}")]
    Connection(#[source] DatabaseError),

    /// A data file could not be listed or read
    #[error("Failed to access data files: {0}")]
    FileAccess(#[from] StorageError),

    /// A data file does not hold an array of objects
    #[error("Error while parsing data file '{file}': {source}")]
    Content {
        file: String,
        #[source]
        source: ContentError,
    },

    /// The database rejected a write
    #[error("Error while writing to collection '{collection}': {source}")]
    Write {
        collection: String,
        #[source]
        source: DatabaseError,
    },
}

impl ImportError {
    /// Stable lowercase category name
    pub fn category(&self) -> &'static str {
        match self {
            ImportError::Configuration(_) => "configuration",
            ImportError::Connection(_) => "connection",
            ImportError::FileAccess(_) => "file_access",
            ImportError::Content { .. } => "content",
            ImportError::Write { .. } => "write",
        }
    }

    fn from_connect(error: DatabaseError) -> Self {
        match error {
            DatabaseError::ConfigError(message) => ImportError::Configuration(message),
            other => ImportError::Connection(other),
        }
    }
}

/// Files selected for import
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// Files to import, keyed by collection name
    pub files: BTreeMap<String, DataFile>,
    /// Files found but filtered out by strict mode
    pub skipped: Vec<String>,
}

impl ImportPlan {
    /// Collection names that will be written, in import order
    pub fn collection_names(&self) -> Vec<&str> {
        self.files.keys().map(String::as_str).collect()
    }

    /// Check if nothing would be imported
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Outcome of a successful import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// Database that was seeded
    pub database: String,
    /// Documents inserted per collection
    pub collections: BTreeMap<String, usize>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Duration of the run in milliseconds
    pub duration_ms: u64,
}

impl ImportReport {
    fn new(database: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            database: database.into(),
            collections: BTreeMap::new(),
            started_at,
            duration_ms: 0,
        }
    }

    /// Documents inserted into one collection
    pub fn inserted(&self, collection: &str) -> Option<usize> {
        self.collections.get(collection).copied()
    }

    /// Number of collections processed
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Total documents inserted
    pub fn total_documents(&self) -> usize {
        self.collections.values().sum()
    }
}

/// Seeds a database from fixture files
pub struct Importer<C, L, E> {
    connector: C,
    lister: L,
    catalog: E,
}

impl<C, L, E> Importer<C, L, E>
where
    C: DatabaseConnector,
    L: FileLister,
    E: EntityCatalog,
{
    /// Create an importer from its collaborators
    pub fn new(connector: C, lister: L, catalog: E) -> Self {
        Self {
            connector,
            lister,
            catalog,
        }
    }

    /// Database connector
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Decide which files a run would import, without touching the database
    pub async fn plan(&self, config: &ImportConfig) -> Result<ImportPlan, ImportError> {
        plan_import(&self.lister, &self.catalog, config).await
    }

    /// Run one import pass
    ///
    /// The connection is closed exactly once after a successful connect,
    /// whether the import succeeds or fails.
    pub async fn run(&mut self, config: &ImportConfig) -> Result<ImportReport, ImportError> {
        config.validate().map_err(ImportError::Configuration)?;

        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            "Connecting to {} ({})...",
            mask_connection_uri(&config.connection_uri),
            self.connector.backend_type()
        );
        let database = self
            .connector
            .connect(&config.connection_uri, config.database_name.as_deref())
            .await
            .map_err(ImportError::from_connect)?;
        info!("Connected to database '{}'", database.name());

        let result = self
            .import_all(&database, config, ImportReport::new(database.name(), started_at))
            .await;
        let closed = self.connector.close().await;

        match (result, closed) {
            (Ok(mut report), Ok(())) => {
                report.duration_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Imported {} documents into {} collections in {}ms",
                    report.total_documents(),
                    report.collection_count(),
                    report.duration_ms
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(ImportError::Connection(e)),
            (Err(e), closed) => {
                if let Err(close_error) = closed {
                    warn!("Failed to close connection after error: {}", close_error);
                }
                Err(e)
            }
        }
    }

    async fn import_all(
        &self,
        database: &C::Database,
        config: &ImportConfig,
        mut report: ImportReport,
    ) -> Result<ImportReport, ImportError> {
        let plan = self.plan(config).await?;

        for (name, file) in &plan.files {
            let inserted = import_file(database, name, file).await?;
            info!("Created collection '{}' and added {} records", name, inserted);
            report.collections.insert(name.clone(), inserted);
        }

        Ok(report)
    }
}

/// List fixture files and apply the strict-mode filter
pub async fn plan_import<L, E>(
    lister: &L,
    catalog: &E,
    config: &ImportConfig,
) -> Result<ImportPlan, ImportError>
where
    L: FileLister,
    E: EntityCatalog,
{
    info!(
        "Fetching all .{} files from the data directory...",
        DATA_FILE_EXTENSION
    );
    let mut files = lister.list_files(DATA_FILE_EXTENSION).await?;
    info!("Fetched {} data files", files.len());

    let mut skipped = Vec::new();
    if config.strict_mode {
        let namespace = config.entity_namespace.as_deref().unwrap_or_default();
        let declared = catalog.declared_collections(namespace);
        info!(
            "Found {} declared collections in '{}'",
            declared.len(),
            namespace
        );

        files.retain(|name, _| {
            let keep = declared.contains(name);
            if !keep {
                skipped.push(name.clone());
            }
            keep
        });
        if !skipped.is_empty() {
            debug!("Skipping undeclared collections: {}", skipped.join(", "));
        }
    }

    Ok(ImportPlan { files, skipped })
}

/// Import one file into the collection of the same name
async fn import_file<D: DatabaseHandle>(
    database: &D,
    name: &str,
    file: &DataFile,
) -> Result<usize, ImportError> {
    let write_error = |source| ImportError::Write {
        collection: name.to_string(),
        source,
    };

    let collection = database.collection(name).await.map_err(write_error)?;

    debug!("Reading {}", file.path().display());
    let content = file.read().await?;
    let documents = parse_documents(&content).map_err(|source| ImportError::Content {
        file: file.path().display().to_string(),
        source,
    })?;

    let mut inserted = 0;
    for document in documents {
        collection.insert_one(document).await.map_err(write_error)?;
        inserted += 1;
    }
    Ok(inserted)
}
