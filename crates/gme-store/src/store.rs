//! Entity store abstraction
//!
//! The migration engine only talks to a cluster through [`EntityStore`]. The
//! same trait is used for the source cluster during discovery and export and
//! for the target cluster during import.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gme_model::{Entity, EntityHeader, EntityId, EntityKind};

use crate::error::StoreError;

/// Attribute filter for [`EntityStore::find_matching`]
///
/// A value ending in `*` matches by prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFilter {
    /// Required attribute values, see [`Entity::attribute`]
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Restrict to entities directly inside this folder
    #[serde(default)]
    pub folder: Option<EntityId>,
}

impl EntityFilter {
    /// Create empty filter matching everything
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require an attribute value
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Restrict to a folder
    #[must_use]
    pub fn in_folder(mut self, folder: EntityId) -> Self {
        self.folder = Some(folder);
        self
    }

    /// Check if an entity satisfies the filter
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(folder) = &self.folder {
            if entity.attribute("folder").as_deref() != Some(folder.as_str()) {
                return false;
            }
        }
        self.attributes.iter().all(|(key, expected)| {
            entity.attribute(key).is_some_and(|actual| match expected.strip_suffix('*') {
                Some(prefix) => actual.starts_with(prefix),
                None => actual == *expected,
            })
        })
    }
}

/// Access to the entities of one cluster
pub trait EntityStore: Send + Sync {
    /// Load the entity behind a header
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] when no entity has the header's kind and id.
    fn find(&self, header: &EntityHeader) -> Result<Entity, StoreError>;

    /// Headers of every entity of a kind
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn find_all(&self, kind: EntityKind) -> Result<Vec<EntityHeader>, StoreError>;

    /// Entities of a kind matching a filter, paged
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn find_matching(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Entity>, StoreError>;

    /// Persist a new entity, returning the identity it was stored under
    ///
    /// # Errors
    /// Returns an error if the entity cannot be stored.
    fn save(&self, entity: &Entity) -> Result<EntityId, StoreError>;

    /// Overwrite an existing entity
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for unknown entities and
    /// [`StoreError::VersionConflict`] for stale versions.
    fn update(&self, entity: &Entity) -> Result<(), StoreError>;

    /// Header for an entity, including store-derived data such as folder paths
    fn describe(&self, entity: &Entity) -> EntityHeader {
        entity.header()
    }

    /// Start a unit of work
    ///
    /// # Errors
    /// Returns an error if a unit of work is already open.
    fn begin(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Make the current unit of work permanent
    ///
    /// # Errors
    /// Returns an error if no unit of work is open.
    fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Discard the current unit of work
    ///
    /// # Errors
    /// Returns an error if no unit of work is open.
    fn rollback(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
