//! Property paths for addressing values inside entities
//!
//! Provides [`PropertyPath`] for locating a dependency inside its owner,
//! including values nested in a policy's assertion tree.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// One step of a [`PropertyPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Named property of the current owner
    Property(String),
    /// Assertion at a pre-order ordinal (starting at 1) of the current policy
    Assertion(u32),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => f.write_str(name),
            Self::Assertion(ordinal) => write!(f, "#{ordinal}"),
        }
    }
}

/// Path within an entity
///
/// # Examples
/// - `["parent"]` → `parent`
/// - `["assertions", #3, "connection"]` → `assertions/#3/connection`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PropertyPath(Vec<PathSegment>);

impl PropertyPath {
    /// Create path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Path to a single named property
    #[inline]
    #[must_use]
    pub fn property(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Property(name.into())])
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First property name, if the path starts with one
    #[must_use]
    pub fn first_property(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Property(name)) => Some(name),
            _ => None,
        }
    }

    /// Last property name, if the path ends with one
    #[must_use]
    pub fn last_property(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Property(name)) => Some(name),
            _ => None,
        }
    }

    /// Append a property segment, returning new path
    #[must_use]
    pub fn child_property(&self, name: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Property(name.into()));
        new
    }

    /// Append an assertion segment, returning new path
    #[must_use]
    pub fn child_assertion(&self, ordinal: u32) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment::Assertion(ordinal));
        new
    }

    /// Split `property/#n/rest...` into the ordinal and the remaining path
    #[must_use]
    pub fn nested_assertion(&self) -> Option<(u32, PropertyPath)> {
        match self.0.as_slice() {
            [PathSegment::Property(_), PathSegment::Assertion(ordinal), rest @ ..] if !rest.is_empty() => {
                Some((*ordinal, Self(rest.to_vec())))
            }
            _ => None,
        }
    }

    /// Check if this path is a prefix of another
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }
        let mut segments = Vec::new();
        for part in s.split('/') {
            if let Some(ordinal) = part.strip_prefix('#') {
                let ordinal = ordinal
                    .parse::<u32>()
                    .map_err(|_| ModelError::InvalidPath(s.to_string()))?;
                segments.push(PathSegment::Assertion(ordinal));
            } else if !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                segments.push(PathSegment::Property(part.to_string()));
            } else {
                return Err(ModelError::InvalidPath(s.to_string()));
            }
        }
        Ok(Self(segments))
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.to_string()
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
