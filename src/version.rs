//! Maven to OSGi version normalization.
//!
//! Maven versions are free form (`1.02-SNAPSHOT`, `2.0.0.RC1`, `1.0-beta-2`)
//! while OSGi requires `major.minor.micro[.qualifier]` with a restricted
//! qualifier alphabet. Conversion happens in three steps: leading zeros are
//! removed from dot segments, the result is split following Maven's
//! four-part rules, and the parts are rendered as an OSGi version.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

static OSGI_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,15})(?:\.(\d{1,9})(?:\.(\d{1,9}))?)?(?:[-.]?([-_.\da-zA-Z]+))?$")
        .expect("valid version pattern")
});

/// What to do with a version that cannot be decomposed into numeric parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionFallback {
    /// Render `0.0.0.<input>` with the input sanitized into a qualifier
    #[default]
    OpaqueQualifier,
    /// Report `Error::VersionFormat`
    Strict,
}

/// Removes leading zeros from every dot delimited segment except the first.
///
/// A segment made only of zeros collapses to a single `0`, and a `-` that
/// directly follows such a segment gets an explicit `0` in front of it.
/// The function is idempotent.
pub fn clean_version_string(version: &str) -> String {
    let mut cleaned = String::with_capacity(version.len() + 2);
    let mut after_dot = false;
    for c in version.chars() {
        match c {
            '.' => {
                if after_dot {
                    cleaned.push('0');
                }
                after_dot = true;
                cleaned.push('.');
            }
            '0' if after_dot => {}
            '-' if after_dot => {
                cleaned.push('0');
                cleaned.push('-');
                after_dot = false;
            }
            _ => {
                after_dot = false;
                cleaned.push(c);
            }
        }
    }
    if after_dot {
        cleaned.push('0');
    }
    cleaned
}

/// A Maven version split into its four parts.
///
/// Missing numeric parts are zero. When the dotted part is not made of plain
/// numbers the whole input becomes the qualifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactVersion {
    pub major: u32,
    pub minor: u32,
    pub incremental: u32,
    pub build_number: Option<u32>,
    pub qualifier: Option<String>,
}

impl ArtifactVersion {
    /// Splits a version, falling back to an all-zero version whose qualifier
    /// is the whole input when the dotted part does not decompose.
    pub fn parse(version: &str) -> Self {
        Self::try_parse(version).unwrap_or_else(|| Self::opaque(version))
    }

    /// Like [`ArtifactVersion::parse`], but returns `None` where `parse`
    /// would fall back.
    pub fn try_parse(version: &str) -> Option<Self> {
        let mut parsed = Self::default();
        let (numbers, suffix) = match version.split_once('-') {
            Some((numbers, suffix)) => (numbers, Some(suffix)),
            None => (version, None),
        };

        if let Some(suffix) = suffix {
            if suffix.len() == 1 || !suffix.starts_with('0') {
                parsed.build_number = parse_int(suffix);
                if parsed.build_number.is_none() {
                    parsed.qualifier = Some(suffix.to_string());
                }
            } else {
                parsed.qualifier = Some(suffix.to_string());
            }
        }

        if !numbers.contains('.') && !numbers.starts_with('0') {
            parsed.major = parse_int(numbers)?;
            return Some(parsed);
        }

        if numbers.contains("..") || numbers.starts_with('.') || numbers.ends_with('.') {
            return None;
        }
        // empty tokens only come from the separators rejected above
        let mut tokens = numbers.split('.').filter(|t| !t.is_empty());
        parsed.major = parse_segment(tokens.next()?)?;
        for slot in [&mut parsed.minor, &mut parsed.incremental] {
            if let Some(token) = tokens.next() {
                *slot = parse_segment(token)?;
            }
        }
        if let Some(token) = tokens.next() {
            if is_digits(token) {
                return None;
            }
            parsed.qualifier = Some(token.to_string());
        }
        Some(parsed)
    }

    fn opaque(version: &str) -> Self {
        Self {
            qualifier: Some(version.to_string()),
            ..Self::default()
        }
    }
}

/// A version in canonical OSGi form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsgiVersion {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: Option<String>,
}

impl OsgiVersion {
    /// Parses a loosely formatted dotted version, sanitizing the qualifier.
    pub fn parse(version: &str) -> Result<Self> {
        let captures = OSGI_VERSION
            .captures(version)
            .ok_or_else(|| Error::VersionFormat(version.to_string()))?;
        let number = |index: usize| -> Result<u64> {
            captures.get(index).map_or(Ok(0), |m| {
                m.as_str()
                    .parse()
                    .map_err(|_| Error::VersionFormat(version.to_string()))
            })
        };
        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            micro: number(3)?,
            qualifier: captures.get(4).map(|m| sanitize_qualifier(m.as_str())),
        })
    }
}

impl From<&ArtifactVersion> for OsgiVersion {
    /// Drops the build number and sanitizes the qualifier.
    fn from(version: &ArtifactVersion) -> Self {
        Self {
            major: u64::from(version.major),
            minor: u64::from(version.minor),
            micro: u64::from(version.incremental),
            qualifier: version
                .qualifier
                .as_deref()
                .filter(|q| !q.is_empty())
                .map(sanitize_qualifier),
        }
    }
}

impl fmt::Display for OsgiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if let Some(qualifier) = &self.qualifier {
            write!(f, ".{qualifier}")?;
        }
        Ok(())
    }
}

/// Converts a Maven version into OSGi form.
///
/// The qualifier is sanitized, so any version whose numeric parts decompose
/// converts.
///
/// # Errors
/// * `Error::VersionFormat` under [`VersionFallback::Strict`] when the
///   cleaned version has no valid numeric triple
pub fn to_osgi_version(version: &str, fallback: VersionFallback) -> Result<String> {
    let cleaned = clean_version_string(version);
    match ArtifactVersion::try_parse(&cleaned) {
        Some(parsed) => Ok(OsgiVersion::from(&parsed).to_string()),
        None => match fallback {
            VersionFallback::Strict => Err(Error::VersionFormat(version.to_string())),
            VersionFallback::OpaqueQualifier => {
                log::debug!("Version '{version}' kept as opaque qualifier");
                let opaque = OsgiVersion {
                    major: 0,
                    minor: 0,
                    micro: 0,
                    qualifier: Some(sanitize_qualifier(cleaned.trim())).filter(|q| !q.is_empty()),
                };
                Ok(opaque.to_string())
            }
        },
    }
}

/// Replaces everything outside `[A-Za-z0-9_-]` with `_`.
fn sanitize_qualifier(qualifier: &str) -> String {
    qualifier
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a non negative number that fits a signed 32 bit integer.
fn parse_int(s: &str) -> Option<u32> {
    if !is_digits(s) {
        return None;
    }
    s.parse::<u32>().ok().filter(|n| *n <= i32::MAX as u32)
}

/// Dot segments with a leading zero are not numbers.
fn parse_segment(s: &str) -> Option<u32> {
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    parse_int(s)
}
