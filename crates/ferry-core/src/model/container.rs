use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::{ParseEnumError, normalize};

/// Store identity of a container (project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub i64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who can see a container without being a member of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Members only.
    #[default]
    Private,
    /// Any signed-in user.
    Internal,
    /// Everyone.
    Public,
}

impl Visibility {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Internal => "internal",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "private" => Ok(Self::Private),
            "internal" => Ok(Self::Internal),
            "public" => Ok(Self::Public),
            _ => Err(ParseEnumError {
                expected: "visibility",
                got: s.to_string(),
            }),
        }
    }
}

/// A project that owns issues and carries its own membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    /// Owning namespace, possibly nested (`group/subgroup`).
    pub namespace: String,
    /// URL slug, unique within the namespace.
    pub path: String,
    /// Human-readable name.
    pub name: String,
    pub visibility: Visibility,
}

impl Container {
    /// Canonical reference form: `namespace/path`.
    ///
    /// This is the prefix written in front of rewritten cross-references and
    /// in provenance notes.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}/{}", self.namespace, self.path)
    }

    /// Label shown in the destination picker: `namespace/name`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Container-qualified reference to one of this container's issues.
    #[must_use]
    pub fn issue_reference(&self, number: u64) -> String {
        format!("{}#{number}", self.full_path())
    }
}

/// Invalid namespace or path segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The input had no `/` separating namespace and path.
    #[error("'{0}' is not a full path; expected namespace/path")]
    MissingNamespace(String),

    /// A segment was empty or used characters outside `[A-Za-z0-9_.-]`.
    #[error("invalid path segment '{segment}' in '{input}'")]
    InvalidSegment { input: String, segment: String },
}

/// Validate a namespace (one or more `/`-separated segments).
///
/// # Errors
///
/// Returns [`PathError::InvalidSegment`] for the first bad segment.
pub fn validate_namespace(namespace: &str) -> Result<(), PathError> {
    for segment in namespace.split('/') {
        validate_segment(namespace, segment)?;
    }
    Ok(())
}

/// Validate a single path slug.
///
/// # Errors
///
/// Returns [`PathError::InvalidSegment`] if the slug is malformed.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    validate_segment(path, path)
}

/// Split `namespace/path` at the last `/` and validate both halves.
///
/// # Errors
///
/// Returns [`PathError`] when the input has no namespace or any segment is
/// malformed.
pub fn split_full_path(full_path: &str) -> Result<(&str, &str), PathError> {
    let (namespace, path) = full_path
        .trim()
        .rsplit_once('/')
        .ok_or_else(|| PathError::MissingNamespace(full_path.to_string()))?;
    validate_namespace(namespace)?;
    validate_path(path)?;
    Ok((namespace, path))
}

fn validate_segment(input: &str, segment: &str) -> Result<(), PathError> {
    let bytes = segment.as_bytes();
    let well_formed = !bytes.is_empty()
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));

    if well_formed {
        Ok(())
    } else {
        Err(PathError::InvalidSegment {
            input: input.to_string(),
            segment: segment.to_string(),
        })
    }
}
