//! featureprep prepares feature description files for conversion into a
//! provisioning model. It resolves feature directories from a structured
//! configuration string, substitutes `${...}` placeholders, injects default
//! ids and normalizes Maven versions into OSGi form.

/// Maven artifact coordinates
pub mod artifact;

/// Command-line interface module for the featureprep binary
pub mod cli;

/// Project configuration handling
/// Supports JSON and YAML formats (featureprep.json, featureprep.yml, featureprep.yaml)
pub mod config;

/// Common constants
pub mod constants;

/// Hand-off of processed features to an external model converter
pub mod converter;

/// Error types and handling
pub mod error;

/// Feature document operations: ids, variables and text extensions
pub mod feature;

/// Structured header (directory clause) parsing
pub mod header;

/// Comment stripping for JSON with comments
pub mod jsonc;

/// Logger initialization
pub mod logger;

/// Feature file discovery and processing
/// Combines all components to produce the processed feature files
pub mod processor;

/// `${...}` placeholder substitution
pub mod substitution;

/// Maven to OSGi version normalization
pub mod version;
