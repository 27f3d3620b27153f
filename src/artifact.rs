//! Maven artifact coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::FEATURE_TYPE;
use crate::error::{Error, Result};

const DEFAULT_TYPE: &str = "jar";

/// Coordinates of the project whose features are being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Project {
    pub fn new<S: Into<String>>(group_id: S, artifact_id: S, version: S) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// The id given to a feature file of this project that declares none.
    pub fn feature_identity(&self, classifier: Option<&str>) -> ArtifactIdentity {
        ArtifactIdentity {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: self.version.clone(),
            classifier: classifier.map(str::to_string),
            kind: FEATURE_TYPE.to_string(),
        }
    }
}

/// A `groupId:artifactId[:type[:classifier]]:version` coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIdentity {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    pub kind: String,
}

impl ArtifactIdentity {
    pub fn new<S: Into<String>>(group_id: S, artifact_id: S, version: S) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            kind: DEFAULT_TYPE.to_string(),
        }
    }

    pub fn with_type<S: Into<String>>(mut self, kind: S) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_classifier<S: Into<String>>(mut self, classifier: S) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Renders the Maven id. The type is left out when it is `jar` and there
    /// is no classifier.
    pub fn to_mvn_id(&self) -> String {
        let mut id = format!("{}:{}", self.group_id, self.artifact_id);
        if self.classifier.is_some() || self.kind != DEFAULT_TYPE {
            id.push(':');
            id.push_str(&self.kind);
            if let Some(classifier) = &self.classifier {
                id.push(':');
                id.push_str(classifier);
            }
        }
        id.push(':');
        id.push_str(&self.version);
        id
    }

    /// Compares group, artifact, classifier and type, ignoring the version.
    pub fn matches(&self, other: &ArtifactIdentity) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.classifier == other.classifier
            && normalize_type(&self.kind) == normalize_type(&other.kind)
    }
}

impl fmt::Display for ArtifactIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_mvn_id())
    }
}

impl FromStr for ArtifactIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::InvalidArtifactId(s.to_string()));
        }
        let identity = match parts.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, *version),
            [group, artifact, kind, version] => {
                Self::new(*group, *artifact, *version).with_type(*kind)
            }
            [group, artifact, kind, classifier, version] => Self::new(*group, *artifact, *version)
                .with_type(*kind)
                .with_classifier(*classifier),
            _ => return Err(Error::InvalidArtifactId(s.to_string())),
        };
        Ok(identity)
    }
}

/// Bundles are usually referenced with type `jar`, so both compare equal.
pub fn normalize_type(kind: &str) -> &str {
    if kind == "bundle" {
        DEFAULT_TYPE
    } else {
        kind
    }
}
