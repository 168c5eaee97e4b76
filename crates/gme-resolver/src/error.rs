//! Resolver error types

use gme_model::{ModelError, ResolverKind};
use gme_store::StoreError;

/// Errors raised by property resolvers
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// No resolver registered for a kind
    #[error("no property resolver registered for {0:?}")]
    NotRegistered(ResolverKind),

    /// Property could not be read
    #[error("cannot read property '{property}' of {owner}: {source}")]
    Read {
        /// Owner description
        owner: String,
        /// Property name
        property: String,
        /// Underlying model error
        #[source]
        source: ModelError,
    },

    /// Property could not be written
    #[error("cannot write property '{property}' of {owner}: {source}")]
    Write {
        /// Owner description
        owner: String,
        /// Property name
        property: String,
        /// Underlying model error
        #[source]
        source: ModelError,
    },

    /// Path does not fit the resolver
    #[error("invalid property path '{0}'")]
    InvalidPath(String),

    /// Mapping the resolver cannot perform
    #[error("unsupported mapping for property '{property}': {reason}")]
    UnsupportedMapping {
        /// Property name
        property: String,
        /// Why the mapping is rejected
        reason: String,
    },

    /// Model error outside a specific property
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Store lookup failed
    #[error("store lookup failed: {0}")]
    Store(#[from] StoreError),
}

impl ResolverError {
    /// Create unsupported mapping error
    #[must_use]
    pub fn unsupported(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedMapping {
            property: property.into(),
            reason: reason.into(),
        }
    }
}
