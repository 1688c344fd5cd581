//! CLI command implementations

pub mod import;
pub mod init;
pub mod plan;

use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::config::ImporterConfig;
use crate::storage::ResourceDirLister;

/// Options shared by commands that read fixture files
#[derive(Debug, Clone, Default)]
pub struct SourceArgs {
    /// Configuration file
    pub config: PathBuf,
    /// Strict mode flag; `None` keeps the configured value
    pub strict: Option<bool>,
    /// Entity namespace override
    pub entity_namespace: Option<String>,
    /// Resource roots override, relative to the working directory
    pub roots: Vec<PathBuf>,
}

impl SourceArgs {
    /// Load the configuration file and apply command line overrides
    pub fn load_config(&self) -> Result<ImporterConfig, CliError> {
        let mut config = ImporterConfig::load(&self.config)?;

        if let Some(strict) = self.strict {
            config.import.strict = strict;
        }
        if let Some(namespace) = &self.entity_namespace {
            config.import.entity_namespace = Some(namespace.clone());
        }
        Ok(config)
    }

    /// File lister honouring `--root`, or the configured roots otherwise
    ///
    /// Configured roots are relative to the configuration file.
    pub fn file_lister(&self, config: &ImporterConfig) -> ResourceDirLister {
        if self.roots.is_empty() {
            config.file_lister(config_base_dir(&self.config))
        } else {
            ResourceDirLister::new(self.roots.clone()).with_data_dir(config.import.data_dir.clone())
        }
    }
}

fn config_base_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Runtime for driving the async library from synchronous handlers
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}
