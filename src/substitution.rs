//! `${...}` placeholder substitution over an ordered chain of property sources.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::artifact::Project;
use crate::version::{to_osgi_version, VersionFallback};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("valid placeholder pattern"));

/// A flat key to value lookup.
///
/// Sources are queried on every substitution, so a source backed by mutable
/// state is seen as it is at call time.
pub trait PropertySource {
    fn get(&self, key: &str) -> Option<String>;
}

impl PropertySource for IndexMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        IndexMap::get(self, key).cloned()
    }
}

impl PropertySource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl PropertySource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

/// Built-in `project.*` properties derived from the project coordinates.
pub struct ProjectProperties<'a> {
    project: &'a Project,
    fallback: VersionFallback,
}

impl<'a> ProjectProperties<'a> {
    pub fn new(project: &'a Project, fallback: VersionFallback) -> Self {
        Self { project, fallback }
    }
}

impl PropertySource for ProjectProperties<'_> {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            "project.groupId" => Some(self.project.group_id.clone()),
            "project.artifactId" => Some(self.project.artifact_id.clone()),
            "project.version" => Some(self.project.version.clone()),
            "project.osgiVersion" => match to_osgi_version(&self.project.version, self.fallback) {
                Ok(version) => Some(version),
                Err(err) => {
                    log::warn!("{err}");
                    None
                }
            },
            _ => None,
        }
    }
}

/// Process environment variables.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentProperties;

impl PropertySource for EnvironmentProperties {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Returns the first value any source has for `key`.
pub fn lookup(sources: &[&dyn PropertySource], key: &str) -> Option<String> {
    sources.iter().find_map(|source| source.get(key))
}

/// Replaces every `${key}` in `text` with the first matching property value.
///
/// Keys are matched literally and unknown keys are left untouched. Replaced
/// values are not scanned again.
pub fn substitute(text: &str, sources: &[&dyn PropertySource]) -> String {
    replace_placeholders(text, sources, str::to_string)
}

/// Like [`substitute`] for serialized JSON whose placeholders all sit inside
/// string literals: values are escaped so quotes and backslashes survive.
pub fn substitute_json(json: &str, sources: &[&dyn PropertySource]) -> String {
    replace_placeholders(json, sources, escape_json)
}

fn replace_placeholders(
    text: &str,
    sources: &[&dyn PropertySource],
    encode: impl Fn(&str) -> String,
) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match lookup(sources, &caps[1]) {
            Some(value) => encode(&value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// The body of a JSON string literal holding `value`.
fn escape_json(value: &str) -> String {
    let quoted = serde_json::Value::from(value).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
