//! Init command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::sample_config;

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Where to write the configuration file
    pub output: PathBuf,
    /// Overwrite an existing file
    pub force: bool,
}

/// Write a sample configuration file
pub fn handle_init(args: &InitArgs) -> Result<(), CliError> {
    if args.output.exists() && !args.force {
        return Err(CliError::FileExists(args.output.clone()));
    }

    std::fs::write(&args.output, sample_config())
        .map_err(|e| CliError::FileWriteError(args.output.clone(), e.to_string()))?;

    println!("Created {}", args.output.display());
    Ok(())
}
