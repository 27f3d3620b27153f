//! Operations on feature documents.
//!
//! A feature is a JSON object. The processor only touches a few reserved
//! parts of it: the top level `id`, the `variables` object and text
//! extensions whose content lives in a separate file.

use std::io;
use std::path::Path;

use log::debug;
use serde_json::{Map, Value};

use crate::artifact::ArtifactIdentity;
use crate::constants::{ID_KEY, PROVISIONING_MODEL_NAME_VARIABLE, PROVISIONING_RUNMODES, VARIABLES_KEY};
use crate::error::{Error, Result};
use crate::processor::ContentReader;

const FILE_PREFIX: &str = "@file";

pub type Document = Map<String, Value>;

fn format_error(location: &str, reason: impl ToString) -> Error {
    Error::FeatureFormat {
        path: location.to_string(),
        reason: reason.to_string(),
    }
}

/// Parses feature JSON, which must be an object.
pub fn parse_document(json: &str, location: &str) -> Result<Document> {
    match serde_json::from_str(json).map_err(|e| format_error(location, e))? {
        Value::Object(document) => Ok(document),
        _ => Err(format_error(location, "feature must be a JSON object")),
    }
}

pub fn to_json(document: &Document, location: &str) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(|e| format_error(location, e))
}

/// Puts `identity` in front of the document unless it already has an id.
///
/// Returns the document and whether an id was added.
pub fn inject_id(document: Document, identity: &ArtifactIdentity) -> (Document, bool) {
    if document.contains_key(ID_KEY) {
        return (document, false);
    }
    let mut with_id = Document::new();
    with_id.insert(ID_KEY.to_string(), Value::String(identity.to_mvn_id()));
    with_id.extend(document);
    (with_id, true)
}

/// Checks that the document id is a valid artifact coordinate.
pub fn validate_id(document: &Document, location: &str) -> Result<ArtifactIdentity> {
    match document.get(ID_KEY) {
        Some(Value::String(id)) => id.parse::<ArtifactIdentity>().map_err(|e| format_error(location, e)),
        Some(_) => Err(format_error(location, "id must be a string")),
        None => Err(format_error(location, "feature has no id")),
    }
}

/// Records run modes and the provisioning model name as feature variables.
///
/// Run modes are appended to any declared value; a declared model name is
/// kept. Returns whether the document changed.
pub fn merge_variables(
    document: &mut Document,
    run_modes: Option<&str>,
    model_name: Option<&str>,
    location: &str,
) -> Result<bool> {
    if run_modes.is_none() && model_name.is_none() {
        return Ok(false);
    }
    let variables = document
        .entry(VARIABLES_KEY)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| format_error(location, "variables must be a JSON object"))?;

    let mut changed = false;
    if let Some(run_modes) = run_modes {
        let merged = match variables.get(PROVISIONING_RUNMODES).and_then(Value::as_str) {
            Some(existing) => format!("{existing},{run_modes}"),
            None => run_modes.to_string(),
        };
        variables.insert(PROVISIONING_RUNMODES.to_string(), Value::String(merged));
        changed = true;
    }
    if let Some(model_name) = model_name {
        let declared = variables
            .get(PROVISIONING_MODEL_NAME_VARIABLE)
            .is_some_and(|v| !v.is_null());
        if !declared {
            variables.insert(
                PROVISIONING_MODEL_NAME_VARIABLE.to_string(),
                Value::String(model_name.to_string()),
            );
            changed = true;
        }
    }
    Ok(changed)
}

/// Text extension declared by a key like `repoinit:TEXT|true`.
fn text_extension_name(key: &str) -> Option<&str> {
    let (name, rest) = key.split_once(':')?;
    let kind = rest.split('|').next().unwrap_or_default();
    kind.eq_ignore_ascii_case("TEXT").then_some(name)
}

fn extension_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(lines) => lines
            .iter()
            .map(|line| line.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(|lines| lines.join("\n")),
        _ => None,
    }
}

/// Replaces `@file` text extensions with the content of the referenced file.
///
/// `@file` reads `<basename>-<extension>.txt`, `@file:<name>` reads
/// `<basename>-<name>`, both next to `feature_file`.
pub fn inline_text_extensions(
    document: &mut Document,
    feature_file: &Path,
    reader: &dyn ContentReader,
) -> Result<bool> {
    let base_name = feature_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = feature_file.parent().unwrap_or_else(|| Path::new(""));

    let mut changed = false;
    for (key, value) in document.iter_mut() {
        let Some(name) = text_extension_name(key) else {
            continue;
        };
        let Some(text) = extension_text(value).filter(|t| t.starts_with(FILE_PREFIX)) else {
            continue;
        };
        let file_name = match &text[FILE_PREFIX.len()..] {
            "" => format!("{base_name}-{name}.txt"),
            reference => match reference.strip_prefix(':') {
                Some(target) => format!("{base_name}-{target}"),
                None => return Err(Error::InvalidFileReference(text.clone())),
            },
        };
        let text_file = directory.join(file_name);
        debug!("Inlining extension '{}' from {}", name, text_file.display());
        let contents = reader.read(&text_file).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::MissingReferencedFile {
                path: text_file.display().to_string(),
            },
            _ => Error::FileRead {
                path: text_file.display().to_string(),
                source,
            },
        })?;
        *value = Value::String(contents);
        changed = true;
    }
    Ok(changed)
}
