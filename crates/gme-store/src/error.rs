//! Store error types

use gme_model::{EntityId, EntityKind};

/// Errors raised by entity stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No entity with this kind and id
    #[error("entity not found: {kind} #{id}")]
    NotFound {
        /// Requested kind
        kind: EntityKind,
        /// Requested id
        id: EntityId,
    },

    /// Entity with a natural identity already exists
    #[error("entity already exists: {kind} #{id}")]
    Duplicate {
        /// Entity kind
        kind: EntityKind,
        /// Entity id
        id: EntityId,
    },

    /// Update based on a stale version
    #[error("stale version for {kind} #{id}: expected {expected}, found {found}")]
    VersionConflict {
        /// Entity kind
        kind: EntityKind,
        /// Entity id
        id: EntityId,
        /// Version held by the store
        expected: u32,
        /// Version carried by the update
        found: u32,
    },

    /// Transaction misuse
    #[error("transaction error: {0}")]
    Transaction(String),

    /// File access failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted snapshot could not be read or written
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create not found error
    #[must_use]
    pub fn not_found(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if the entity was simply absent
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
