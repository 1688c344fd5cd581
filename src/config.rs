//! Importer configuration
//!
//! Two layers:
//! - [`ImportConfig`]: the immutable value handed to [`crate::Importer::run`]
//! - [`ImporterConfig`]: the `mongo-importer.toml` file format with
//!   environment variable overrides, used by the CLI and by hosts that keep
//!   seeding settings next to their fixtures

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{EntityDeclaration, EntityRegistry};
use crate::storage::{DEFAULT_DATA_DIR, ResourceDirLister};

/// Default configuration filename
pub const CONFIG_FILENAME: &str = "mongo-importer.toml";

/// Environment variable for the connection URI
pub const ENV_URI: &str = "MONGO_IMPORTER_URI";

/// Environment variable for the database name override
pub const ENV_DATABASE: &str = "MONGO_IMPORTER_DATABASE";

/// Environment variable for strict mode
pub const ENV_STRICT: &str = "MONGO_IMPORTER_STRICT";

/// Environment variable for the entity namespace
pub const ENV_ENTITY_NAMESPACE: &str = "MONGO_IMPORTER_ENTITY_NAMESPACE";

/// Error type for configuration files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration TOML
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serialising the configuration failed
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An environment override holds a value that cannot be used
    #[error("Invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Settings for one import run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Connection URI, may embed the database name
    pub connection_uri: String,
    /// Database name, takes precedence over the URI name when non-blank
    pub database_name: Option<String>,
    /// Only import files matching a declared entity collection
    pub strict_mode: bool,
    /// Namespace whose entity declarations are consulted in strict mode
    pub entity_namespace: Option<String>,
}

impl ImportConfig {
    /// Permissive configuration for `connection_uri`
    pub fn new(connection_uri: impl Into<String>) -> Self {
        Self {
            connection_uri: connection_uri.into(),
            ..Default::default()
        }
    }

    /// Set the database name override
    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = Some(database_name.into());
        self
    }

    /// Enable strict mode for entities under `namespace`
    pub fn with_strict_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.strict_mode = true;
        self.entity_namespace = Some(namespace.into());
        self
    }

    /// Toggle strict mode without changing the namespace
    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }

    /// Check the configuration before a run
    ///
    /// A missing entity namespace is deliberately not an error: strict mode
    /// then simply matches no files.
    pub fn validate(&self) -> Result<(), String> {
        if self.connection_uri.trim().is_empty() {
            return Err("Connection URI must not be empty".to_string());
        }
        Ok(())
    }
}

/// `[database]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseSection {
    /// Connection URI
    #[serde(default)]
    pub uri: Option<String>,

    /// Database name override
    #[serde(default)]
    pub name: Option<String>,
}

/// `[import]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSection {
    /// Strict mode
    #[serde(default)]
    pub strict: bool,

    /// Entity namespace for strict mode
    #[serde(default)]
    pub entity_namespace: Option<String>,

    /// Resource roots scanned for the data directory
    #[serde(default = "default_resource_roots")]
    pub resource_roots: Vec<PathBuf>,

    /// Name of the data directory under each root
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_resource_roots() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_data_dir() -> String {
    DEFAULT_DATA_DIR.to_string()
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            strict: false,
            entity_namespace: None,
            resource_roots: default_resource_roots(),
            data_dir: default_data_dir(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `mongo-importer.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImporterConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseSection,

    /// Import behaviour
    #[serde(default)]
    pub import: ImportSection,

    /// Entity declarations for strict mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityDeclaration>,
}

impl ImporterConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// Falls back to defaults if the file does not exist. Environment
    /// variable overrides are applied either way.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides read through `lookup`
    ///
    /// A strict flag that is not a recognised boolean is an error rather
    /// than falling back to permissive mode.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(uri) = lookup(ENV_URI) {
            self.database.uri = Some(uri);
        }

        if let Some(name) = lookup(ENV_DATABASE) {
            self.database.name = Some(name);
        }

        if let Some(strict) = lookup(ENV_STRICT) {
            self.import.strict = parse_bool(&strict).ok_or(ConfigError::InvalidEnv {
                var: ENV_STRICT,
                value: strict,
            })?;
        }

        if let Some(namespace) = lookup(ENV_ENTITY_NAMESPACE) {
            self.import.entity_namespace = Some(namespace);
        }
        Ok(())
    }

    /// Runtime import settings
    pub fn import_config(&self) -> ImportConfig {
        ImportConfig {
            connection_uri: self.database.uri.clone().unwrap_or_default(),
            database_name: self.database.name.clone(),
            strict_mode: self.import.strict,
            entity_namespace: self.import.entity_namespace.clone(),
        }
    }

    /// File lister for the configured resource roots
    ///
    /// Relative roots are resolved against `base_dir`.
    pub fn file_lister(&self, base_dir: &Path) -> ResourceDirLister {
        let roots = self
            .import
            .resource_roots
            .iter()
            .map(|root| {
                if root.is_absolute() {
                    root.clone()
                } else {
                    base_dir.join(root)
                }
            })
            .collect();
        ResourceDirLister::new(roots).with_data_dir(self.import.data_dir.clone())
    }

    /// Entity registry built from `[[entities]]`
    pub fn entity_registry(&self) -> EntityRegistry {
        EntityRegistry::from_declarations(self.entities.iter().cloned())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Mongo JSON importer configuration

[database]
# Connection URI; the path segment names the database
uri = "mongodb://localhost:27017/seed"

# Overrides the database named in the URI
# name = "seed"

[import]
# Only import files whose name matches a declared entity collection
strict = false

# Namespace whose entities are consulted in strict mode
# entity_namespace = "my_app::models"

# Each root is scanned for <root>/<data_dir>/*.json
resource_roots = ["."]
data_dir = "data"

# Entity declarations used by strict mode
# [[entities]]
# type = "my_app::models::User"
# collection = "users"
"#
}
