//! In-memory document store backend
//!
//! Keeps databases, collections and documents in process memory. The store
//! is shared: every [`MemoryConnector`] created from one [`MemoryStore`]
//! sees the same data, so a host (or a test) can inspect what an import
//! wrote after the connector has been closed.

use async_trait::async_trait;
use bson::Document;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{
    CollectionHandle, DatabaseConnector, DatabaseError, DatabaseHandle, DatabaseResult,
    database_from_uri, resolve_database_name,
};

#[derive(Debug, Default)]
struct MemoryState {
    databases: HashMap<String, BTreeMap<String, Vec<Document>>>,
    open_clients: usize,
    connect_count: usize,
    close_count: usize,
    unreachable: bool,
    rejected_collections: BTreeSet<String>,
}

/// Shared in-memory document store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses every connection attempt
    pub fn unreachable() -> Self {
        let state = MemoryState {
            unreachable: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Create a connector bound to this store
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector::new(self.clone())
    }

    /// Make every insert into `collection` fail
    pub async fn reject_writes_to(&self, collection: impl Into<String>) {
        self.state
            .lock()
            .await
            .rejected_collections
            .insert(collection.into());
    }

    /// Documents stored in a collection, in insertion order
    pub async fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        let state = self.state.lock().await;
        state
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of documents in a collection
    pub async fn count(&self, database: &str, collection: &str) -> usize {
        let state = self.state.lock().await;
        state
            .databases
            .get(database)
            .and_then(|collections| collections.get(collection))
            .map_or(0, Vec::len)
    }

    /// Names of every collection that exists in a database
    pub async fn collection_names(&self, database: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .databases
            .get(database)
            .map(|collections| collections.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Clients currently open against this store
    pub async fn open_clients(&self) -> usize {
        self.state.lock().await.open_clients
    }

    /// Total successful connects
    pub async fn connect_count(&self) -> usize {
        self.state.lock().await.connect_count
    }

    /// Total closes that released a client
    pub async fn close_count(&self) -> usize {
        self.state.lock().await.close_count
    }
}

/// Connector for a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryConnector {
    store: MemoryStore,
    database: Option<MemoryDatabase>,
}

impl MemoryConnector {
    /// Create a connector bound to `store`
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            database: None,
        }
    }

    /// Underlying shared store
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }
}

#[async_trait]
impl DatabaseConnector for MemoryConnector {
    type Database = MemoryDatabase;

    async fn connect(
        &mut self,
        connection_uri: &str,
        database_override: Option<&str>,
    ) -> DatabaseResult<MemoryDatabase> {
        let mut state = self.store.state.lock().await;
        if state.unreachable {
            return Err(DatabaseError::ConnectionFailed(format!(
                "Memory store unreachable at {}",
                super::mask_connection_uri(connection_uri)
            )));
        }

        let uri_database = database_from_uri(connection_uri);
        let name = resolve_database_name(database_override, uri_database.as_deref())?;

        if self.database.is_some() {
            // Reconnecting replaces the previous client
            state.open_clients = state.open_clients.saturating_sub(1);
        }
        state.open_clients += 1;
        state.connect_count += 1;

        let database = MemoryDatabase {
            store: self.store.clone(),
            name,
        };
        self.database = Some(database.clone());
        Ok(database)
    }

    fn database(&self) -> DatabaseResult<MemoryDatabase> {
        self.database.clone().ok_or(DatabaseError::NotConnected)
    }

    async fn close(&mut self) -> DatabaseResult<()> {
        if self.database.take().is_some() {
            let mut state = self.store.state.lock().await;
            state.open_clients = state.open_clients.saturating_sub(1);
            state.close_count += 1;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.database.is_some()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

/// Database inside a [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    store: MemoryStore,
    name: String,
}

#[async_trait]
impl DatabaseHandle for MemoryDatabase {
    type Collection = MemoryCollection;

    fn name(&self) -> &str {
        &self.name
    }

    async fn collection(&self, name: &str) -> DatabaseResult<MemoryCollection> {
        let mut state = self.store.state.lock().await;
        state
            .databases
            .entry(self.name.clone())
            .or_default()
            .entry(name.to_string())
            .or_default();

        Ok(MemoryCollection {
            store: self.store.clone(),
            database: self.name.clone(),
            name: name.to_string(),
        })
    }
}

/// Collection inside a [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    store: MemoryStore,
    database: String,
    name: String,
}

#[async_trait]
impl CollectionHandle for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, document: Document) -> DatabaseResult<()> {
        let mut state = self.store.state.lock().await;
        if state.open_clients == 0 {
            return Err(DatabaseError::NotConnected);
        }
        if state.rejected_collections.contains(&self.name) {
            return Err(DatabaseError::WriteFailed(format!(
                "Collection '{}' rejected the document",
                self.name
            )));
        }

        state
            .databases
            .entry(self.database.clone())
            .or_default()
            .entry(self.name.clone())
            .or_default()
            .push(document);
        Ok(())
    }
}
