//! Entity catalog
//!
//! Strict imports only accept files whose name matches a collection that a
//! data-model type declares explicitly. Types opt in by implementing
//! [`DocumentMapping`] and being registered with an [`EntityRegistry`], or
//! by being listed in the `[[entities]]` section of the configuration file.
//!
//! ```
//! use mongo_json_importer::catalog::{DocumentMapping, EntityCatalog, EntityRegistry};
//!
//! mod models {
//!     pub struct User;
//!     pub struct AuditEntry;
//! }
//!
//! impl DocumentMapping for models::User {
//!     const COLLECTION: Option<&'static str> = Some("users");
//! }
//! // No explicit collection: never part of the declared set
//! impl DocumentMapping for models::AuditEntry {}
//!
//! let mut registry = EntityRegistry::new();
//! registry.register::<models::User>();
//! registry.register::<models::AuditEntry>();
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

static NAMESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid regex")
});

/// Marker for data-model types stored in a named collection
pub trait DocumentMapping {
    /// Explicit collection name. `None` means the type relies on a derived
    /// default and does not take part in strict filtering.
    const COLLECTION: Option<&'static str> = None;
}

/// A data-model type and the collection it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDeclaration {
    /// Fully-qualified type path, e.g. `my_app::models::User`
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicitly declared collection name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl EntityDeclaration {
    /// Create a declaration
    pub fn new(type_name: impl Into<String>, collection: Option<&str>) -> Self {
        Self {
            type_name: type_name.into(),
            collection: collection.map(str::to_string),
        }
    }

    /// Collection name, only when it is present and non-blank
    ///
    /// The name is returned verbatim; it must equal a file base name exactly.
    pub fn explicit_collection(&self) -> Option<&str> {
        self.collection
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Whether this type lives under `namespace` (already normalised)
    fn belongs_to(&self, namespace: &str) -> bool {
        let type_name = normalize_path(&self.type_name);
        type_name == namespace
            || type_name
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with("::"))
    }
}

/// Source of declared collection names
pub trait EntityCatalog: Send + Sync {
    /// Collection names explicitly declared by types under `namespace`
    ///
    /// Never fails: a blank or malformed namespace yields an empty set.
    fn declared_collections(&self, namespace: &str) -> BTreeSet<String>;
}

/// Declarative registry of entity declarations
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    declarations: Vec<EntityDeclaration>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from existing declarations
    pub fn from_declarations(declarations: impl IntoIterator<Item = EntityDeclaration>) -> Self {
        Self {
            declarations: declarations.into_iter().collect(),
        }
    }

    /// Register a type implementing [`DocumentMapping`]
    ///
    /// The type path comes from [`std::any::type_name`], whose output is not
    /// guaranteed to be stable across compiler versions. Use
    /// [`declare`](Self::declare) with an explicit path when namespace
    /// matching must be exact.
    pub fn register<T: DocumentMapping + ?Sized>(&mut self) -> &mut Self {
        self.declare(std::any::type_name::<T>(), T::COLLECTION)
    }

    /// Register a type by path
    pub fn declare(&mut self, type_name: impl Into<String>, collection: Option<&str>) -> &mut Self {
        self.declarations
            .push(EntityDeclaration::new(type_name, collection));
        self
    }

    /// All registered declarations
    pub fn declarations(&self) -> &[EntityDeclaration] {
        &self.declarations
    }

    /// Number of registered declarations
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl EntityCatalog for EntityRegistry {
    fn declared_collections(&self, namespace: &str) -> BTreeSet<String> {
        let namespace = normalize_path(namespace.trim());
        if namespace.is_empty() {
            debug!("No entity namespace given, no collections declared");
            return BTreeSet::new();
        }
        if !NAMESPACE_PATTERN.is_match(&namespace) {
            warn!("Ignoring malformed entity namespace '{}'", namespace);
            return BTreeSet::new();
        }

        self.declarations
            .iter()
            .filter(|declaration| declaration.belongs_to(&namespace))
            .filter_map(EntityDeclaration::explicit_collection)
            .map(str::to_string)
            .collect()
    }
}

/// Normalise `.` separated paths to `::`
fn normalize_path(path: &str) -> String {
    if path.contains("::") {
        path.to_string()
    } else {
        path.replace('.', "::")
    }
}
