//! CLI binary entry point for mongo-json-importer

use clap::{Parser, Subcommand};
use mongo_json_importer::cli::commands::SourceArgs;
use mongo_json_importer::cli::commands::import::{ImportArgs, handle_import};
use mongo_json_importer::cli::commands::init::{InitArgs, handle_init};
use mongo_json_importer::cli::commands::plan::handle_plan;
use mongo_json_importer::cli::error::CliError;
use mongo_json_importer::config::CONFIG_FILENAME;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "mongo-json-importer")]
#[command(about = "Seed a MongoDB database from JSON fixture files")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone, Debug)]
struct SourceOptions {
    /// Only import files matching a declared entity collection
    #[arg(long)]
    strict: bool,

    /// Namespace whose entity declarations are used in strict mode
    #[arg(long)]
    entity_namespace: Option<String>,

    /// Resource root scanned for data/*.json (repeatable)
    #[arg(long = "root")]
    roots: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every data file into its collection
    Import {
        /// Connection URI (overrides the configuration file)
        #[arg(long)]
        uri: Option<String>,

        /// Database name (overrides the name in the URI)
        #[arg(short, long)]
        database: Option<String>,

        /// Print the import report as JSON
        #[arg(long)]
        output_json: bool,

        #[command(flatten)]
        source: SourceOptions,
    },

    /// Show which data files would be imported, without connecting
    Plan {
        #[command(flatten)]
        source: SourceOptions,
    },

    /// Write a sample configuration file
    Init {
        /// Output path for the configuration file
        #[arg(short, long, default_value = CONFIG_FILENAME)]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

impl SourceOptions {
    fn into_args(self, config: PathBuf) -> SourceArgs {
        SourceArgs {
            config,
            // The flag can only switch strict mode on
            strict: self.strict.then_some(true),
            entity_namespace: self.entity_namespace,
            roots: self.roots,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.verbosity, &cli.log_format) {
        eprintln!("Failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Import {
            uri,
            database,
            output_json,
            source,
        } => {
            let args = ImportArgs {
                source: source.into_args(cli.config),
                uri,
                database,
                output_json,
            };
            handle_import(&args)?;
        }
        Commands::Plan { source } => {
            handle_plan(&source.into_args(cli.config))?;
        }
        Commands::Init { output, force } => {
            handle_init(&InitArgs { output, force })?;
        }
    }
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> anyhow::Result<()> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
    } else {
        subscriber.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }

    Ok(())
}
