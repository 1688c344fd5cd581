//! Mongo JSON importer - seeds a document database from JSON fixture files
//!
//! Given a `data/` directory of `<collection>.json` files, each holding a
//! JSON array of objects, an import run:
//! - connects to the database
//! - lists every fixture file
//! - in strict mode, keeps only files whose name is a collection declared
//!   by a registered entity
//! - inserts every object of every remaining file into the collection named
//!   after the file
//! - closes the connection
//!
//! ```no_run
//! use mongo_json_importer::{
//!     EntityRegistry, ImportConfig, Importer, MongoConnector, ResourceDirLister,
//! };
//!
//! # async fn seed() -> Result<(), mongo_json_importer::ImportError> {
//! let mut importer = Importer::new(
//!     MongoConnector::new(),
//!     ResourceDirLister::single("."),
//!     EntityRegistry::new(),
//! );
//! let report = importer
//!     .run(&ImportConfig::new("mongodb://localhost:27017/seed"))
//!     .await?;
//! println!("{} documents", report.total_documents());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod database;
pub mod import;
pub mod storage;

// Re-export commonly used types
pub use catalog::{DocumentMapping, EntityCatalog, EntityDeclaration, EntityRegistry};
pub use config::{ImportConfig, ImporterConfig};
#[cfg(feature = "mongodb-backend")]
pub use database::MongoConnector;
pub use database::{
    CollectionHandle, DatabaseConnector, DatabaseError, DatabaseHandle, MemoryConnector,
    MemoryStore,
};
pub use import::{ContentError, ImportError, ImportPlan, ImportReport, Importer, plan_import};
pub use storage::{DataFile, FileLister, ResourceDirLister, StorageError};
