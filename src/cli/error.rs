//! CLI-specific error types

use crate::config::ConfigError;
use crate::import::ImportError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File already exists: {0} (use --force to overwrite)")]
    FileExists(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Import failed: {0}")]
    ImportError(#[from] ImportError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::ImportError(e) => match e {
                ImportError::Configuration(_) => 2,
                ImportError::Connection(_) => 3,
                ImportError::FileAccess(_) => 4,
                ImportError::Content { .. } => 5,
                ImportError::Write { .. } => 6,
            },
            CliError::ConfigError(_) | CliError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }
}
