//! Project configuration for featureprep.
//! Loads `featureprep.json`, `featureprep.yml` or `featureprep.yaml` from the
//! base directory and layers command-line overrides on top.

use crate::artifact::Project;
use crate::cli::Args;
use crate::constants::{CONFIG_FILES, DEFAULT_FEATURES_DIRECTORY, DEFAULT_TARGET_DIRECTORY};
use crate::error::{Error, Result};
use crate::processor::{CachePolicy, DirectoryKeys};
use crate::version::VersionFallback;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub project: Option<Project>,
    /// Directory clause string, see [`crate::header`]
    pub features_directory: String,
    pub default_model_name: Option<String>,
    pub target_directory: PathBuf,
    /// Project-declared properties, consulted last
    pub properties: IndexMap<String, String>,
    pub cache: CachePolicy,
    pub version_fallback: VersionFallback,
    pub directory_keys: DirectoryKeys,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: None,
            features_directory: DEFAULT_FEATURES_DIRECTORY.to_string(),
            default_model_name: None,
            target_directory: PathBuf::from(DEFAULT_TARGET_DIRECTORY),
            properties: IndexMap::new(),
            cache: CachePolicy::default(),
            version_fallback: VersionFallback::default(),
            directory_keys: DirectoryKeys::default(),
        }
    }
}

impl Config {
    /// The project coordinates.
    ///
    /// # Errors
    /// * `Error::ConfigError` if neither the file nor the command line set them
    pub fn project(&self) -> Result<&Project> {
        self.project.as_ref().ok_or_else(|| {
            Error::ConfigError(
                "project coordinates are missing, set them in the configuration file \
                 or pass --group-id, --artifact-id and --project-version"
                    .to_string(),
            )
        })
    }

    /// Applies command-line overrides.
    pub fn with_args(mut self, args: &Args) -> Result<Self> {
        if let Some(features_directory) = &args.features_directory {
            self.features_directory = features_directory.clone();
        }
        if let Some(target_dir) = &args.target_dir {
            self.target_directory = target_dir.clone();
        }
        if args.default_model_name.is_some() {
            self.default_model_name = args.default_model_name.clone();
        }
        if let Some(cache) = args.cache {
            self.cache = cache;
        }

        let overrides = [&args.group_id, &args.artifact_id, &args.project_version];
        if overrides.iter().any(|o| o.is_some()) {
            let mut project = match self.project.take() {
                Some(project) => project,
                None => match (&args.group_id, &args.artifact_id, &args.project_version) {
                    (Some(g), Some(a), Some(v)) => Project::new(g.as_str(), a.as_str(), v.as_str()),
                    _ => {
                        return Err(Error::ConfigError(
                            "--group-id, --artifact-id and --project-version must be given \
                             together when no configuration file defines the project"
                                .to_string(),
                        ))
                    }
                },
            };
            if let Some(group_id) = &args.group_id {
                project.group_id = group_id.clone();
            }
            if let Some(artifact_id) = &args.artifact_id {
                project.artifact_id = artifact_id.clone();
            }
            if let Some(version) = &args.project_version {
                project.version = version.clone();
            }
            self.project = Some(project);
        }
        Ok(self)
    }
}

/// Loads configuration from a directory, trying multiple file formats.
///
/// # Arguments
/// * `base_dir` - Directory containing the configuration
/// * `config_files` - List of configuration files to try
///
/// # Returns
/// * `Result<Option<String>>` - Contents of the first found configuration file
pub fn load_config<P: AsRef<Path>>(base_dir: P, config_files: &[&str]) -> Result<Option<String>> {
    for file in config_files {
        let config_path = base_dir.as_ref().join(file);
        if config_path.exists() {
            debug!("Loading configuration from {}", config_path.display());
            return Ok(Some(std::fs::read_to_string(&config_path).map_err(Error::IoError)?));
        }
    }
    debug!("No configuration file found (tried: {})", config_files.join(", "));
    Ok(None)
}

/// Parses configuration content, trying JSON first and YAML second.
///
/// # Errors
/// * `Error::ConfigError` if the content is neither
pub fn parse_config(content: &str) -> Result<Config> {
    match serde_json::from_str(content) {
        Ok(config) => Ok(config),
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {e}"))),
    }
}

/// Returns the configuration of `base_dir`, or the defaults when it has none.
pub fn get_config<P: AsRef<Path>>(base_dir: P) -> Result<Config> {
    match load_config(base_dir, &CONFIG_FILES)? {
        Some(content) => parse_config(&content),
        None => Ok(Config::default()),
    }
}
