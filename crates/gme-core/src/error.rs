//! Error types for GME Core
//!
//! Errors raised while discovering, exporting or importing carry the header
//! they concern, so the caller sees which entity failed and why:
//!
//! ```text
//! unable to import entity:
//! JDBC_CONNECTION, orders (#4f1c...)
//! due to:
//! entity not found: ...
//! ```

use gme_graph::GraphError;
use gme_model::EntityHeader;
use gme_resolver::ResolverError;
use gme_store::StoreError;

use crate::checker::ServiceConflict;
use crate::manager::ValidationFinding;

/// Main migration error type
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Required input missing or empty
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Failure concerning one entity
    #[error("{summary}:\n{header}\ndue to:\n{source}")]
    Entity {
        /// What was being attempted
        summary: String,
        /// Kind, name and id of the entity
        header: String,
        /// Underlying cause
        #[source]
        source: Box<MigrationError>,
    },

    /// Entity missing from the bundle and the target
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Store access failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Resolver failed
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// Bundle could not be read or written
    #[error("bundle error: {0}")]
    Bundle(#[from] GraphError),

    /// Service would capture another service's traffic
    #[error("service resolution conflict: {0}")]
    Conflict(#[from] ServiceConflict),

    /// Strict validation rejected the bundle
    #[error("bundle failed validation with {} finding(s)", .0.len())]
    Validation(Vec<ValidationFinding>),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    /// Attach an entity to an error
    #[must_use]
    pub fn for_header(
        summary: impl Into<String>,
        header: &EntityHeader,
        source: impl Into<MigrationError>,
    ) -> Self {
        Self::Entity {
            summary: summary.into(),
            header: header.to_string(),
            source: Box::new(source.into()),
        }
    }

    /// Create not-found error for a header
    #[must_use]
    pub fn not_found(header: &EntityHeader) -> Self {
        Self::NotFound(header.to_string())
    }

    /// Check if the root cause is a missing entity
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Store(error) => error.is_not_found(),
            Self::Entity { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Check if the root cause is a service conflict
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Entity { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gme_model::EntityKind;

    #[test]
    fn entity_error_names_header_and_cause() {
        let header = EntityHeader::new(EntityKind::Policy, "p1").with_name("auth");
        let error = MigrationError::for_header(
            "unable to import entity",
            &header,
            StoreError::not_found(EntityKind::Policy, "p1"),
        );
        let message = error.to_string();
        assert!(message.starts_with("unable to import entity:\nPOLICY, auth (#p1)\ndue to:\n"));
        assert!(error.is_not_found());
        assert!(!error.is_conflict());
    }
}
