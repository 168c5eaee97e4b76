//! Entity headers
//!
//! An [`EntityHeader`] is the lightweight, comparable reference used as the
//! node identity everywhere in the migration graph. Two headers are equal when
//! their kind and id are equal; every other field is descriptive.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::kind::{EntityId, EntityKind};
use crate::path::PropertyPath;

/// Whether a mapping to a target-side entity or value is needed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingSelection {
    /// No mapping is possible
    #[default]
    None,
    /// A mapping may be assigned
    Optional,
    /// A mapping must be assigned before import
    Required,
}

impl MappingSelection {
    /// Check if a mapping may be assigned
    #[inline]
    #[must_use]
    pub fn is_mappable(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Value-mapping state of a header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMapping {
    /// Whether a value mapping is possible or needed
    pub selection: MappingSelection,
    /// Value as seen on the source cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    /// Replacement assigned by the operator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_value: Option<String>,
}

/// Location of a literal value inside its owning entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueReference {
    /// Kind of the owning entity
    pub owner_kind: EntityKind,
    /// Identity of the owning entity
    pub owner_id: EntityId,
    /// Where the value lives inside the owner
    pub path: PropertyPath,
}

impl ValueReference {
    /// Create new value reference
    #[must_use]
    pub fn new(owner_kind: EntityKind, owner_id: EntityId, path: PropertyPath) -> Self {
        Self {
            owner_kind,
            owner_id,
            path,
        }
    }

    /// Header of the owning entity
    #[must_use]
    pub fn owner_header(&self) -> EntityHeader {
        EntityHeader::new(self.owner_kind, self.owner_id.clone())
    }
}

/// Lightweight reference to an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityHeader {
    kind: EntityKind,
    id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Folder path for folders, free text otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_mapping: Option<ValueMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_ref: Option<ValueReference>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra: BTreeMap<String, String>,
}

impl EntityHeader {
    /// Create new header for kind and id
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            description: None,
            version: 0,
            value_mapping: None,
            value_ref: None,
            extra: BTreeMap::new(),
        }
    }

    /// Create header for a literal value embedded in another entity.
    ///
    /// The id is derived from the owner and the path, so the same value always
    /// yields the same header.
    #[must_use]
    pub fn value_reference(
        reference: ValueReference,
        display_value: impl Into<String>,
        selection: MappingSelection,
    ) -> Self {
        let id = format!("{}:{}:{}", reference.owner_kind, reference.owner_id, reference.path);
        let display_value = display_value.into();
        let mut header = Self::new(EntityKind::ValueReference, id);
        header.name = Some(display_value.clone());
        header.value_mapping = Some(ValueMapping {
            selection,
            display_value: Some(display_value),
            mapped_value: None,
        });
        header.value_ref = Some(reference);
        header
    }

    /// Set display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set value-mapping state
    #[inline]
    #[must_use]
    pub fn with_value_mapping(mut self, mapping: ValueMapping) -> Self {
        self.value_mapping = Some(mapping);
        self
    }

    /// Add a kind-specific attribute
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Entity kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Entity identity
    #[inline]
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Display name, if known
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display name, falling back to the identity
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Description (folder path for folders)
    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Replace description
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Version on the cluster the header was taken from
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Value-mapping state
    #[inline]
    #[must_use]
    pub fn value_mapping(&self) -> Option<&ValueMapping> {
        self.value_mapping.as_ref()
    }

    /// Replace value-mapping state
    pub fn set_value_mapping(&mut self, mapping: Option<ValueMapping>) {
        self.value_mapping = mapping;
    }

    /// Value-mapping selection, `None` when the header carries no mapping state
    #[must_use]
    pub fn value_selection(&self) -> MappingSelection {
        self.value_mapping
            .as_ref()
            .map_or(MappingSelection::None, |m| m.selection)
    }

    /// Operator-assigned replacement value
    #[must_use]
    pub fn mapped_value(&self) -> Option<&str> {
        self.value_mapping
            .as_ref()
            .and_then(|m| m.mapped_value.as_deref())
    }

    /// Assign or clear the replacement value
    pub fn set_mapped_value(&mut self, value: Option<String>) {
        self.value_mapping.get_or_insert_with(ValueMapping::default).mapped_value = value;
    }

    /// Location of the value, for value-reference headers
    #[inline]
    #[must_use]
    pub fn value_ref(&self) -> Option<&ValueReference> {
        self.value_ref.as_ref()
    }

    /// Check if this header stands for a literal value
    #[inline]
    #[must_use]
    pub fn is_value_reference(&self) -> bool {
        self.value_ref.is_some()
    }

    /// Kind-specific attributes
    #[inline]
    #[must_use]
    pub fn extra(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    /// Look up a kind-specific attribute
    #[must_use]
    pub fn extra_property(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    /// Copy attributes missing here from another header
    pub fn merge_extra(&mut self, other: &BTreeMap<String, String>) {
        for (key, value) in other {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

impl PartialEq for EntityHeader {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for EntityHeader {}

impl Hash for EntityHeader {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.id.hash(state);
    }
}

impl PartialOrd for EntityHeader {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityHeader {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Display for EntityHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {} (#{})", self.kind, self.display_name(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_descriptive_fields() {
        let a = EntityHeader::new(EntityKind::Policy, "p1").with_name("one");
        let b = EntityHeader::new(EntityKind::Policy, "p1")
            .with_name("other")
            .with_version(7);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
    }

    #[test]
    fn same_id_different_kind_differs() {
        let a = EntityHeader::new(EntityKind::Policy, "x");
        let b = EntityHeader::new(EntityKind::Folder, "x");
        assert_ne!(a, b);
    }

    #[test]
    fn value_reference_id_is_derived_from_owner() {
        let path: PropertyPath = "assertions/#2/url".parse().unwrap();
        let reference = ValueReference::new(EntityKind::Policy, EntityId::new("p1"), path);
        let header = EntityHeader::value_reference(
            reference.clone(),
            "http://backend",
            MappingSelection::Optional,
        );
        assert_eq!(header.id().as_str(), "POLICY:p1:assertions/#2/url");
        assert_eq!(header.kind(), EntityKind::ValueReference);
        assert_eq!(header.value_selection(), MappingSelection::Optional);
        assert_eq!(header.value_ref(), Some(&reference));
        assert_eq!(reference.owner_header(), EntityHeader::new(EntityKind::Policy, "p1"));
    }

    #[test]
    fn mapped_value_round_trip() {
        let mut header = EntityHeader::new(EntityKind::JdbcConnection, "c1");
        assert_eq!(header.mapped_value(), None);
        header.set_mapped_value(Some("jdbc:target".into()));
        assert_eq!(header.mapped_value(), Some("jdbc:target"));
    }

    #[test]
    fn display_uses_name_or_id() {
        let named = EntityHeader::new(EntityKind::Folder, "f1").with_name("Root");
        assert_eq!(named.to_string(), "FOLDER, Root (#f1)");
        let unnamed = EntityHeader::new(EntityKind::Folder, "f2");
        assert_eq!(unnamed.to_string(), "FOLDER, f2 (#f2)");
    }
}
