//! Command-line interface implementation for featureprep.
//! Provides argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::processor::CachePolicy;

/// Command-line arguments structure for featureprep.
#[derive(Parser, Debug)]
#[command(author, version, about = "featureprep: prepare feature files for provisioning model conversion", long_about = None)]
pub struct Args {
    /// Project base directory
    #[arg(value_name = "BASE_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Feature directories as clauses, e.g. "src/main/features;model=boot;runmodes=author"
    #[arg(long, value_name = "CLAUSES")]
    pub features_directory: Option<String>,

    /// Project group id
    #[arg(long)]
    pub group_id: Option<String>,

    /// Project artifact id
    #[arg(long)]
    pub artifact_id: Option<String>,

    /// Project version
    #[arg(long)]
    pub project_version: Option<String>,

    /// Define a property used for ${...} substitution
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Build output directory, relative to the base directory
    #[arg(long, value_name = "DIR")]
    pub target_dir: Option<PathBuf>,

    /// Provisioning model name for features whose directory sets none
    #[arg(long)]
    pub default_model_name: Option<String>,

    /// How processed files are judged up to date
    #[arg(long, value_enum)]
    pub cache: Option<CachePolicy>,

    /// Delete previously processed files first
    #[arg(long)]
    pub clean: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Splits a `KEY=VALUE` definition at the first `=`.
pub fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("invalid definition '{s}', expected KEY=VALUE")),
    }
}

/// Parses command line arguments, exiting with clap's error handling on failure.
pub fn get_args() -> Args {
    Args::parse()
}
