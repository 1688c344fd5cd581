//! Document database abstraction
//!
//! This module provides the connection lifecycle used by the importer:
//! - MongoDB: the production backend (feature `mongodb-backend`)
//! - Memory: an in-process store with the same semantics, used by tests
//!   and by hosts that want to seed something other than a live server
//!
//! A connector owns exactly one client. It is opened once with
//! [`DatabaseConnector::connect`] and released once with
//! [`DatabaseConnector::close`].

use async_trait::async_trait;
use bson::Document;

pub mod memory;

#[cfg(feature = "mongodb-backend")]
pub mod mongodb;

pub use memory::{MemoryConnector, MemoryStore};

#[cfg(feature = "mongodb-backend")]
pub use self::mongodb::MongoConnector;

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Configuration error (no usable database name, unparsable URI)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The server rejected a write
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Operation requires an open connection
    #[error("Database not connected. Call connect() first.")]
    NotConnected,
}

/// Result type for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A named collection inside a connected database
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// Collection name, exactly as requested
    fn name(&self) -> &str;

    /// Insert one document
    ///
    /// No upsert and no deduplication: every call stores a new document.
    async fn insert_one(&self, document: Document) -> DatabaseResult<()>;
}

/// A connected database
#[async_trait]
pub trait DatabaseHandle: Clone + Send + Sync {
    /// Collection handle type produced by this database
    type Collection: CollectionHandle;

    /// Effective database name
    fn name(&self) -> &str;

    /// Resolve the named collection, creating it on the backend if the
    /// backend materialises collections eagerly
    async fn collection(&self, name: &str) -> DatabaseResult<Self::Collection>;
}

/// Connection lifecycle for a document database backend
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Database handle type produced by this connector
    type Database: DatabaseHandle;

    /// Open a client and resolve the effective database
    ///
    /// # Arguments
    /// * `connection_uri` - Backend connection URI, may embed a database name
    /// * `database_override` - Takes precedence over the URI name when non-blank
    ///
    /// # Returns
    /// Handle to the resolved database
    async fn connect(
        &mut self,
        connection_uri: &str,
        database_override: Option<&str>,
    ) -> DatabaseResult<Self::Database>;

    /// Handle opened by the last successful `connect`
    fn database(&self) -> DatabaseResult<Self::Database>;

    /// Release the client. A no-op when nothing is open.
    async fn close(&mut self) -> DatabaseResult<()>;

    /// Whether a client is currently open
    fn is_connected(&self) -> bool;

    /// Backend type name ("mongodb" or "memory")
    fn backend_type(&self) -> &'static str;
}

/// Pick the effective database name
///
/// The override wins when it has text, otherwise the name embedded in the
/// connection URI is used. The chosen name is passed through untouched.
/// Neither yielding a non-blank name is a configuration error.
pub fn resolve_database_name(
    database_override: Option<&str>,
    uri_database: Option<&str>,
) -> DatabaseResult<String> {
    database_override
        .filter(|name| !name.trim().is_empty())
        .or_else(|| uri_database.filter(|name| !name.trim().is_empty()))
        .map(str::to_string)
        .ok_or_else(|| {
            DatabaseError::ConfigError("No database name in URI or passed as argument".to_string())
        })
}

/// Database name embedded in a connection URI
///
/// `scheme://[user:pass@]host[:port][,host...]/<database>[?options]`
pub fn database_from_uri(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split('?').next().unwrap_or_default().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Connection URI with the password replaced by `****`, safe for logs
pub fn mask_connection_uri(uri: &str) -> String {
    let authority_start = uri.find("://").map(|pos| pos + 3).unwrap_or(0);
    if let Some(at_offset) = uri[authority_start..].find('@') {
        let at_pos = authority_start + at_offset;
        if let Some(colon_pos) = uri[authority_start..at_pos].rfind(':') {
            let colon_pos = authority_start + colon_pos;
            return format!("{}****{}", &uri[..colon_pos + 1], &uri[at_pos..]);
        }
    }
    uri.to_string()
}
