//! Import command implementation

use crate::cli::commands::{SourceArgs, runtime};
use crate::cli::error::CliError;
use crate::config::{ImportConfig, ImporterConfig};
use crate::database::MongoConnector;
use crate::import::{ImportReport, Importer};

/// Import command arguments
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    /// Fixture source options
    pub source: SourceArgs,
    /// Connection URI override
    pub uri: Option<String>,
    /// Database name override
    pub database: Option<String>,
    /// Print the report as JSON
    pub output_json: bool,
}

impl ImportArgs {
    /// Resolve the runtime import settings on top of the loaded file
    pub fn import_config(&self, config: &ImporterConfig) -> Result<ImportConfig, CliError> {
        let mut import = config.import_config();

        if let Some(uri) = &self.uri {
            import.connection_uri = uri.clone();
        }
        if let Some(database) = &self.database {
            import.database_name = Some(database.clone());
        }
        if import.connection_uri.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "No connection URI: pass --uri, set [database] uri or MONGO_IMPORTER_URI"
                    .to_string(),
            ));
        }
        Ok(import)
    }
}

/// Handle the import command
pub fn handle_import(args: &ImportArgs) -> Result<(), CliError> {
    let config = args.source.load_config()?;
    let import_config = args.import_config(&config)?;

    let mut importer = Importer::new(
        MongoConnector::new(),
        args.source.file_lister(&config),
        config.entity_registry(),
    );

    let rt = runtime()?;
    let report = rt.block_on(importer.run(&import_config))?;

    if args.output_json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::SerializationError(e.to_string()))?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!("Database: {}", report.database);
    if report.collections.is_empty() {
        println!("  (no data files imported)");
    }
    for (collection, count) in &report.collections {
        println!("  {:<32} {:>8} documents", collection, count);
    }
    println!(
        "Imported {} documents into {} collections in {}ms",
        report.total_documents(),
        report.collection_count(),
        report.duration_ms
    );
}
