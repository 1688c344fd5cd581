//! Plan command implementation
//!
//! Shows which fixture files an import would write, and which strict mode
//! would skip, without connecting to a database.

use crate::cli::commands::{SourceArgs, runtime};
use crate::cli::error::CliError;
use crate::import::{ImportPlan, plan_import};

/// Handle the plan command
pub fn handle_plan(args: &SourceArgs) -> Result<ImportPlan, CliError> {
    let config = args.load_config()?;
    let lister = args.file_lister(&config);
    let registry = config.entity_registry();
    let import_config = config.import_config();

    let rt = runtime()?;
    let plan = rt.block_on(plan_import(&lister, &registry, &import_config))?;

    if plan.is_empty() {
        println!("No data files would be imported");
    }
    for (name, file) in &plan.files {
        println!("import  {:<32} {}", name, file.path().display());
    }
    for name in &plan.skipped {
        println!("skip    {:<32} (no declared entity collection)", name);
    }
    Ok(plan)
}
