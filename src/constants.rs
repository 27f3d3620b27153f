//! Common constants used throughout featureprep.

/// Supported project configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 3] = ["featureprep.json", "featureprep.yml", "featureprep.yaml"];

/// Directory clause string used when none is configured
pub const DEFAULT_FEATURES_DIRECTORY: &str = "src/main/features";

/// Build output root, relative to the base directory
pub const DEFAULT_TARGET_DIRECTORY: &str = "target";

/// Cache of processed feature files, relative to the target directory
pub const PROCESSED_DIR: &str = "features/processed";

/// Converter output, relative to the target directory
pub const CONVERTED_DIR: &str = "provisioning/converted";

/// Only files with this extension are picked up from feature directories
pub const FEATURE_EXTENSION: &str = ".json";

/// The feature file that does not contribute a classifier to its id
pub const DEFAULT_FEATURE_FILE: &str = "feature.json";

/// Artifact type of generated feature ids
pub const FEATURE_TYPE: &str = "slingosgifeature";

pub const ID_KEY: &str = "id";
pub const VARIABLES_KEY: &str = "variables";
pub const PROVISIONING_MODEL_NAME_VARIABLE: &str = "provisioning.model.name";
pub const PROVISIONING_RUNMODES: &str = "provisioning.runmodes";

/// Default clause attribute keys
pub const RUNMODES_ATTRIBUTE: &str = "runmodes";
pub const MODEL_ATTRIBUTE: &str = "model";
