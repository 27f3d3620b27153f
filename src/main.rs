//! featureprep's main application entry point.
//! Handles command-line argument parsing and drives directory resolution
//! and feature processing.

use featureprep::{
    cli::{get_args, Args},
    config::get_config,
    constants::PROCESSED_DIR,
    error::{default_error_handler, Result},
    logger::init_logger,
    processor::{resolve_files, FsReader, Processor},
    substitution::{EnvironmentProperties, ProjectProperties, PropertySource},
};
use indexmap::IndexMap;

/// Main application entry point.
fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the project configuration and applies command-line overrides
/// 2. Optionally clears the processed cache
/// 3. Resolves feature files from the directory clauses
/// 4. Processes every feature file with the property chain: project
///    coordinates, `-D` definitions, environment, configured properties
fn run(args: Args) -> Result<()> {
    let config = get_config(&args.base_dir)?.with_args(&args)?;
    let project = config.project()?;

    let target_dir = args.base_dir.join(&config.target_directory);
    let reader = FsReader;
    let processor = Processor::new(&reader, project, target_dir.join(PROCESSED_DIR), config.cache)
        .with_default_model_name(config.default_model_name.clone());
    if args.clean {
        processor.clean()?;
    }

    let entries = resolve_files(&args.base_dir, &config.features_directory, &config.directory_keys)?;
    if entries.is_empty() {
        log::info!("No feature files found for '{}'", config.features_directory);
        return Ok(());
    }

    let builtins = ProjectProperties::new(project, config.version_fallback);
    let defines: IndexMap<String, String> = args.defines.iter().cloned().collect();
    let environment = EnvironmentProperties;
    let sources: [&dyn PropertySource; 4] = [&builtins, &defines, &environment, &config.properties];

    let processed = processor.process_all(&entries, &sources)?;
    for feature in &processed {
        println!("{}: '{}'", feature.action, feature.output.display());
    }

    println!(
        "Feature processing completed successfully in {}.",
        processor.processed_dir().display()
    );
    Ok(())
}
