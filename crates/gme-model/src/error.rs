//! Model error types

/// Errors raised while reading or writing entity properties
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Property not declared by the owner
    #[error("unknown property '{property}' on {owner}")]
    UnknownProperty {
        /// Owner description
        owner: String,
        /// Requested property
        property: String,
    },

    /// Value of the wrong shape for the property
    #[error("property '{property}' expects {expected}")]
    TypeMismatch {
        /// Property name
        property: String,
        /// Expected value shape
        expected: &'static str,
    },

    /// Malformed property path
    #[error("invalid property path '{0}'")]
    InvalidPath(String),

    /// Assertion ordinal outside the policy tree
    #[error("assertion #{0} not found")]
    AssertionNotFound(u32),

    /// Unknown entity kind name
    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),

    /// Malformed `keystore:alias` reference
    #[error("invalid key reference '{0}'")]
    InvalidKeyReference(String),
}

impl ModelError {
    /// Create unknown property error
    #[must_use]
    pub fn unknown_property(owner: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            owner: owner.into(),
            property: property.into(),
        }
    }

    /// Create type mismatch error
    #[must_use]
    pub fn type_mismatch(property: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            property: property.into(),
            expected,
        }
    }
}
