//! Feature file discovery and processing.
//!
//! Directories come from a header style configuration string, see
//! [`crate::header`]. Every feature file found there is read, stripped of
//! comments, given an id when it has none, run through placeholder
//! substitution and tagged with run modes and a provisioning model name.
//! Results are written to a processed directory that doubles as a cache
//! between runs.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::time::SystemTime;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::artifact::{ArtifactIdentity, Project};
use crate::constants::{DEFAULT_FEATURE_FILE, FEATURE_EXTENSION, MODEL_ATTRIBUTE, RUNMODES_ATTRIBUTE};
use crate::error::{Error, Result};
use crate::feature;
use crate::header::parse_header;
use crate::jsonc::strip_comments;
use crate::substitution::{substitute_json, PropertySource};

/// A feature file together with the tags its directory clauses gave it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFileEntry {
    pub file: PathBuf,
    /// Run modes of every clause listing the file, in clause order
    pub run_modes: Option<String>,
    /// Model name of the first clause listing the file that has one
    pub model_name: Option<String>,
}

impl FeatureFileEntry {
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        Self {
            file: file.into(),
            run_modes: None,
            model_name: None,
        }
    }

    fn tag(&mut self, run_modes: Option<&str>, model_name: Option<&str>) {
        if let Some(run_modes) = run_modes {
            self.run_modes = Some(match self.run_modes.take() {
                Some(existing) => format!("{existing},{run_modes}"),
                None => run_modes.to_string(),
            });
        }
        if self.model_name.is_none() {
            self.model_name = model_name.map(str::to_string);
        }
    }
}

/// Clause parameter keys that carry run modes and the model name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DirectoryKeys {
    pub runmodes: String,
    pub model: String,
}

impl Default for DirectoryKeys {
    fn default() -> Self {
        Self {
            runmodes: RUNMODES_ATTRIBUTE.to_string(),
            model: MODEL_ATTRIBUTE.to_string(),
        }
    }
}

/// How an existing processed file is judged up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Skip a file whose output is newer than its source
    #[default]
    Mtime,
    /// Always process, rewrite only when the output digest changes
    ContentHash,
}

/// Source of raw feature and extension text.
pub trait ContentReader {
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Reads from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl ContentReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

fn normalize_separators(path: &str) -> String {
    path.trim().replace('/', &MAIN_SEPARATOR.to_string())
}

fn is_feature_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(FEATURE_EXTENSION))
}

/// Lists the feature files named by a directory configuration string.
///
/// Directories are visited in clause order and files in filesystem order. A
/// file listed by several clauses appears once, at its first position, with
/// the run modes of all those clauses joined by commas and the first model
/// name found. Missing directories are skipped.
///
/// # Errors
/// * Any error from [`parse_header`]; no entries are returned in that case
/// * `Error::IoError` if a directory cannot be listed
pub fn resolve_files<P: AsRef<Path>>(
    base_dir: P,
    config: &str,
    keys: &DirectoryKeys,
) -> Result<Vec<FeatureFileEntry>> {
    let base_dir = base_dir.as_ref();
    let clauses = parse_header(config)?;
    let mut entries: IndexMap<PathBuf, FeatureFileEntry> = IndexMap::new();

    for clause in &clauses {
        let directory = match clause.path().map(normalize_separators) {
            Some(directory) if !directory.is_empty() => directory,
            _ => {
                debug!("Skipping clause without directory: {clause}");
                continue;
            }
        };
        let features_dir = base_dir.join(&directory);
        if !features_dir.is_dir() {
            warn!("Feature directory {} does not exist", features_dir.display());
            continue;
        }
        debug!("Scanning feature directory {}", features_dir.display());

        let run_modes = clause.parameter(&keys.runmodes);
        let model_name = clause.parameter(&keys.model);
        for dir_entry in WalkDir::new(&features_dir).min_depth(1).max_depth(1) {
            let dir_entry = dir_entry.map_err(|e| Error::IoError(e.into()))?;
            let path = dir_entry.path();
            if !is_feature_file(path) {
                continue;
            }
            entries
                .entry(path.to_path_buf())
                .or_insert_with(|| FeatureFileEntry::new(path))
                .tag(run_modes, model_name);
        }
    }

    Ok(entries.into_values().collect())
}

/// The classifier a feature file contributes to a generated id: its base
/// name, unless it is the default feature file.
pub fn suggested_classifier(file: &Path) -> Option<String> {
    let name = file.file_name()?.to_str()?;
    if name == DEFAULT_FEATURE_FILE {
        return None;
    }
    file.file_stem().map(|s| s.to_string_lossy().into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAction {
    Processed,
    Cached,
}

impl fmt::Display for ProcessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessAction::Processed => write!(f, "processed"),
            ProcessAction::Cached => write!(f, "cached"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessedFeature {
    pub source: PathBuf,
    pub output: PathBuf,
    pub action: ProcessAction,
}

/// Turns feature file entries into processed feature files.
pub struct Processor<'a> {
    reader: &'a dyn ContentReader,
    project: &'a Project,
    processed_dir: PathBuf,
    cache: CachePolicy,
    default_model_name: Option<String>,
}

impl<'a> Processor<'a> {
    pub fn new<P: Into<PathBuf>>(
        reader: &'a dyn ContentReader,
        project: &'a Project,
        processed_dir: P,
        cache: CachePolicy,
    ) -> Self {
        Self {
            reader,
            project,
            processed_dir: processed_dir.into(),
            cache,
            default_model_name: None,
        }
    }

    /// Model name for entries whose clauses supply none.
    pub fn with_default_model_name(mut self, name: Option<String>) -> Self {
        self.default_model_name = name;
        self
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Removes all cached output.
    pub fn clean(&self) -> Result<()> {
        if self.processed_dir.exists() {
            debug!("Deleting {}", self.processed_dir.display());
            fs::remove_dir_all(&self.processed_dir).map_err(|source| Error::FileWrite {
                path: self.processed_dir.display().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn output_path(&self, entry: &FeatureFileEntry) -> PathBuf {
        match entry.file.file_name() {
            Some(name) => self.processed_dir.join(name),
            None => self.processed_dir.join(&entry.file),
        }
    }

    /// Produces the processed content of one feature file.
    ///
    /// `identity` becomes the feature id when the file declares none.
    ///
    /// # Errors
    /// * `Error::FileRead` if the file cannot be read
    /// * `Error::FeatureFormat` if it is not a JSON object or its id is malformed
    /// * `Error::MissingReferencedFile` / `Error::InvalidFileReference` for
    ///   broken `@file` text extensions
    pub fn process_file(
        &self,
        entry: &FeatureFileEntry,
        sources: &[&dyn PropertySource],
        identity: &ArtifactIdentity,
    ) -> Result<String> {
        let location = entry.file.display().to_string();
        let raw = self.reader.read(&entry.file).map_err(|source| Error::FileRead {
            path: location.clone(),
            source,
        })?;

        let document = feature::parse_document(&strip_comments(&raw, &location)?, &location)?;
        let (document, injected) = feature::inject_id(document, identity);
        if injected {
            debug!("Feature {location} has no id, using {identity}");
        }

        let substituted = substitute_json(&feature::to_json(&document, &location)?, sources);
        let mut document = feature::parse_document(&substituted, &location)?;
        let id = feature::validate_id(&document, &location)?;
        debug!("Processing feature {id} from {location}");

        let model_name = entry
            .model_name
            .as_deref()
            .or(self.default_model_name.as_deref());
        feature::merge_variables(&mut document, entry.run_modes.as_deref(), model_name, &location)?;
        feature::inline_text_extensions(&mut document, &entry.file, self.reader)?;

        feature::to_json(&document, &location)
    }

    /// Processes entries in order, stopping at the first failure.
    pub fn process_all(
        &self,
        entries: &[FeatureFileEntry],
        sources: &[&dyn PropertySource],
    ) -> Result<Vec<ProcessedFeature>> {
        fs::create_dir_all(&self.processed_dir).map_err(|source| Error::FileWrite {
            path: self.processed_dir.display().to_string(),
            source,
        })?;

        let mut processed = Vec::with_capacity(entries.len());
        for entry in entries {
            let output = self.output_path(entry);
            let action = self.process_entry(entry, &output, sources)?;
            processed.push(ProcessedFeature {
                source: entry.file.clone(),
                output,
                action,
            });
        }

        let cached = processed
            .iter()
            .filter(|p| p.action == ProcessAction::Cached)
            .count();
        info!(
            "Processed {} feature file(s), {} unchanged",
            processed.len(),
            cached
        );
        Ok(processed)
    }

    fn process_entry(
        &self,
        entry: &FeatureFileEntry,
        output: &Path,
        sources: &[&dyn PropertySource],
    ) -> Result<ProcessAction> {
        if self.cache == CachePolicy::Mtime && is_newer(output, &entry.file) {
            debug!("{} is up to date", output.display());
            return Ok(ProcessAction::Cached);
        }

        let classifier = suggested_classifier(&entry.file);
        let identity = self.project.feature_identity(classifier.as_deref());
        let content = self.process_file(entry, sources, &identity)?;

        if self.cache == CachePolicy::ContentHash {
            let digest = content_digest(content.as_bytes());
            if fs::read(output).is_ok_and(|existing| content_digest(&existing) == digest) {
                debug!("{} unchanged ({})", output.display(), &digest[..12]);
                return Ok(ProcessAction::Cached);
            }
        }

        fs::write(output, content).map_err(|source| Error::FileWrite {
            path: output.display().to_string(),
            source,
        })?;
        Ok(ProcessAction::Processed)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// True when `output` exists and was modified strictly after `source`.
fn is_newer(output: &Path, source: &Path) -> bool {
    match (modified(output), modified(source)) {
        (Some(output), Some(source)) => output > source,
        _ => false,
    }
}

fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}
