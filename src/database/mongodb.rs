//! MongoDB database backend implementation
//!
//! Opens one `mongodb::Client` per import run. The driver connects lazily,
//! so `connect` issues a single `ping` to turn the connection attempt into
//! something that can fail up front. There is no retry.

use async_trait::async_trait;
use bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use tracing::debug;

use super::{
    CollectionHandle, DatabaseConnector, DatabaseError, DatabaseHandle, DatabaseResult,
    mask_connection_uri, resolve_database_name,
};

/// MongoDB connector
#[derive(Default)]
pub struct MongoConnector {
    client: Option<Client>,
    database: Option<MongoDatabase>,
}

impl MongoConnector {
    /// Create an unconnected connector
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseConnector for MongoConnector {
    type Database = MongoDatabase;

    async fn connect(
        &mut self,
        connection_uri: &str,
        database_override: Option<&str>,
    ) -> DatabaseResult<MongoDatabase> {
        let masked = mask_connection_uri(connection_uri);

        let options = ClientOptions::parse(connection_uri).await.map_err(|e| {
            DatabaseError::ConfigError(format!("Invalid connection URI {}: {}", masked, e))
        })?;

        // No client exists yet if the name is missing
        let name = resolve_database_name(database_override, options.default_database.as_deref())?;

        let client = Client::with_options(options).map_err(|e| {
            DatabaseError::ConnectionFailed(format!(
                "Failed to create client for {}: {}",
                masked, e
            ))
        })?;

        let database = client.database(&name);
        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(DatabaseError::ConnectionFailed(format!(
                "Failed to reach MongoDB at {}: {}",
                masked, e
            )));
        }
        debug!("Connected to MongoDB at {}, database '{}'", masked, name);

        // A second connect replaces the previous client
        if let Some(previous) = self.client.take() {
            previous.shutdown().await;
        }

        let handle = MongoDatabase { inner: database };
        self.client = Some(client);
        self.database = Some(handle.clone());
        Ok(handle)
    }

    fn database(&self) -> DatabaseResult<MongoDatabase> {
        self.database.clone().ok_or(DatabaseError::NotConnected)
    }

    async fn close(&mut self) -> DatabaseResult<()> {
        self.database = None;
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("MongoDB client shut down");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn backend_type(&self) -> &'static str {
        "mongodb"
    }
}

/// Connected MongoDB database
#[derive(Clone)]
pub struct MongoDatabase {
    inner: Database,
}

#[async_trait]
impl DatabaseHandle for MongoDatabase {
    type Collection = MongoCollection;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn collection(&self, name: &str) -> DatabaseResult<MongoCollection> {
        // MongoDB creates the collection implicitly on the first insert
        Ok(MongoCollection {
            inner: self.inner.collection::<Document>(name),
        })
    }
}

/// MongoDB collection of raw BSON documents
#[derive(Clone)]
pub struct MongoCollection {
    inner: Collection<Document>,
}

#[async_trait]
impl CollectionHandle for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_one(&self, document: Document) -> DatabaseResult<()> {
        self.inner.insert_one(document).await.map_err(|e| {
            DatabaseError::WriteFailed(format!(
                "Insert into '{}' failed: {}",
                self.inner.name(),
                e
            ))
        })?;
        Ok(())
    }
}
