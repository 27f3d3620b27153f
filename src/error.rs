//! Error handling for featureprep.
//! Defines the error taxonomy and the result alias used throughout the crate.

use std::io;
use thiserror::Error;

/// Errors raised while resolving, processing or converting feature files.
///
/// Header and version errors come from the leaf parsers; file errors carry
/// the offending path so a failed batch can be traced back to one feature.
#[derive(Error, Debug)]
pub enum Error {
    /// The directory configuration string could not be tokenized.
    #[error("Unable to parse header: {header}")]
    HeaderSyntax { header: String },

    /// The same attribute or directive key appeared twice in one clause.
    #[error("Duplicate '{key}' in: {header}")]
    DuplicateAttribute { key: String, header: String },

    /// A version could not be split into major, minor and micro parts.
    #[error("Invalid version: {0}")]
    VersionFormat(String),

    #[error("Unable to read feature {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Unable to write processed feature {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A text extension references a file next to the feature that is not there.
    #[error("Extension text file {path} not found.")]
    MissingReferencedFile { path: String },

    #[error("Invalid file reference: {0}")]
    InvalidFileReference(String),

    /// The feature document is not a usable JSON object.
    #[error("{path} : {reason}")]
    FeatureFormat { path: String, reason: String },

    #[error("Invalid artifact id: {0}")]
    InvalidArtifactId(String),

    /// Failure reported by the external model converter.
    #[error("Cannot convert feature files to provisioning model: {0}")]
    Convert(String),

    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
