//! Portable migration bundles
//!
//! A [`MigrationBundle`] carries the dependency graph of an export together
//! with the serialized payload of every header that travels with it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use gme_model::{Entity, EntityHeader};

use crate::error::GraphError;
use crate::metadata::MigrationMetadata;

/// Bundle format written by this version
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Payload of one exported header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedItem {
    header: EntityHeader,
    entity: Entity,
    /// Whether the header carried an operator-assigned value at export time
    #[serde(default)]
    mapped_value: bool,
}

impl ExportedItem {
    /// Create new item
    #[must_use]
    pub fn new(header: EntityHeader, entity: Entity) -> Self {
        let mapped_value = header.mapped_value().is_some();
        Self {
            header,
            entity,
            mapped_value,
        }
    }

    /// Exported header
    #[inline]
    #[must_use]
    pub fn header(&self) -> &EntityHeader {
        &self.header
    }

    /// Exported entity
    #[inline]
    #[must_use]
    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// Mutable exported entity, used for the working copy during import
    #[inline]
    pub fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    /// Whether a replacement value was assigned
    #[inline]
    #[must_use]
    pub fn has_mapped_value(&self) -> bool {
        self.mapped_value
    }
}

/// Dependency graph plus payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationBundle {
    format_version: u32,
    exported_at: DateTime<Utc>,
    metadata: MigrationMetadata,
    #[serde(with = "indexmap::map::serde_seq", default)]
    items: IndexMap<EntityHeader, ExportedItem>,
}

impl MigrationBundle {
    /// Create bundle around discovered metadata
    #[must_use]
    pub fn new(metadata: MigrationMetadata) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            exported_at: Utc::now(),
            metadata,
            items: IndexMap::new(),
        }
    }

    /// Add a payload, replacing any payload for the same header
    pub fn add_exported_item(&mut self, item: ExportedItem) {
        self.items.insert(item.header().clone(), item);
    }

    /// Format version the bundle was written with
    #[inline]
    #[must_use]
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// Export timestamp
    #[inline]
    #[must_use]
    pub fn exported_at(&self) -> DateTime<Utc> {
        self.exported_at
    }

    /// Dependency graph and mappings
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &MigrationMetadata {
        &self.metadata
    }

    /// Mutable metadata, for assigning mappings before import
    #[inline]
    pub fn metadata_mut(&mut self) -> &mut MigrationMetadata {
        &mut self.metadata
    }

    /// Payloads keyed by header
    #[inline]
    #[must_use]
    pub fn items(&self) -> &IndexMap<EntityHeader, ExportedItem> {
        &self.items
    }

    /// Payload of a header
    #[must_use]
    pub fn item(&self, header: &EntityHeader) -> Option<&ExportedItem> {
        self.items.get(header)
    }

    /// Check if the bundle carries a payload for a header
    #[must_use]
    pub fn has_value_for_header(&self, header: &EntityHeader) -> bool {
        self.items.contains_key(header)
    }

    /// Exported entity of a header
    #[must_use]
    pub fn exported_entity(&self, header: &EntityHeader) -> Option<&Entity> {
        self.items.get(header).map(ExportedItem::entity)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a bundle, rejecting unknown format versions
    ///
    /// # Errors
    /// Returns [`GraphError::UnsupportedFormat`] for bundles written by a newer format.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let bundle: Self = serde_json::from_str(json)?;
        if bundle.format_version > BUNDLE_FORMAT_VERSION {
            return Err(GraphError::UnsupportedFormat {
                found: bundle.format_version,
                supported: BUNDLE_FORMAT_VERSION,
            });
        }
        Ok(bundle)
    }

    /// SHA-256 over metadata and payloads, independent of the export time
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn fingerprint(&self) -> Result<String, GraphError> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&self.metadata)?);
        for item in self.items.values() {
            hasher.update(serde_json::to_vec(item)?);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}
