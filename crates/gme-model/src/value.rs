//! Property values and the owner abstraction resolvers work against

use std::fmt::Debug;

use crate::descriptor::DependencyDescriptor;
use crate::error::ModelError;
use crate::header::EntityHeader;
use crate::kind::EntityKind;
use crate::policy::{KeyReference, Policy};

/// Value of a dependency-bearing property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Property is unset
    Empty,
    /// Single entity reference
    Reference(EntityHeader),
    /// Ordered entity references
    References(Vec<EntityHeader>),
    /// Literal text (connection name, URL, expression)
    Text(String),
    /// Keystore and alias of a private key
    Key(KeyReference),
}

impl PropertyValue {
    /// Referenced headers, empty for literal values
    #[must_use]
    pub fn headers(&self) -> Vec<EntityHeader> {
        match self {
            Self::Reference(header) => vec![header.clone()],
            Self::References(headers) => headers.clone(),
            _ => Vec::new(),
        }
    }

    /// Literal text, if any
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Check if the property is unset
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Anything that carries dependency-bearing properties: entities and assertions
pub trait PropertyOwner: Debug {
    /// Kind of the owner, `None` for assertions
    fn owner_kind(&self) -> Option<EntityKind>;

    /// Short description used in error messages
    fn owner_label(&self) -> String;

    /// Dependency-bearing properties declared by the owner
    fn descriptors(&self) -> &'static [DependencyDescriptor];

    /// Read a property
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownProperty`] for undeclared properties.
    fn property(&self, name: &str) -> Result<PropertyValue, ModelError>;

    /// Write a property
    ///
    /// # Errors
    /// Returns an error for undeclared properties or values of the wrong shape.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ModelError>;

    /// Assertion tree, for owners that embed one
    fn policy(&self) -> Option<&Policy> {
        None
    }

    /// Mutable assertion tree, for owners that embed one
    fn policy_mut(&mut self) -> Option<&mut Policy> {
        None
    }
}
