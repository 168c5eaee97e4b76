//! Dependency edges

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use gme_model::{DependencyDescriptor, EntityHeader, MappingSelection, PropertyPath, ResolverKind};

/// Directed edge from a dependant to the entity it references
///
/// Two edges are equal when dependant, dependency and property path are
/// equal; the mapping flags are carried along from the declaring descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationDependency {
    dependant: EntityHeader,
    dependency: EntityHeader,
    property: PropertyPath,
    resolver: ResolverKind,
    #[serde(default)]
    name_mapping: MappingSelection,
    #[serde(default)]
    value_mapping: MappingSelection,
    #[serde(default = "exported_default")]
    exported: bool,
}

fn exported_default() -> bool {
    true
}

impl MigrationDependency {
    /// Create edge with the flags of the declaring descriptor
    #[must_use]
    pub fn new(
        dependant: EntityHeader,
        dependency: EntityHeader,
        property: PropertyPath,
        descriptor: &DependencyDescriptor,
    ) -> Self {
        Self {
            dependant,
            dependency,
            property,
            resolver: descriptor.resolver,
            name_mapping: descriptor.name_mapping,
            value_mapping: descriptor.value_mapping,
            exported: descriptor.exported,
        }
    }

    /// Override name-mapping selection
    #[must_use]
    pub fn with_name_mapping(mut self, selection: MappingSelection) -> Self {
        self.name_mapping = selection;
        self
    }

    /// Entity holding the reference
    #[inline]
    #[must_use]
    pub fn dependant(&self) -> &EntityHeader {
        &self.dependant
    }

    /// Referenced entity
    #[inline]
    #[must_use]
    pub fn dependency(&self) -> &EntityHeader {
        &self.dependency
    }

    /// Location of the reference inside the dependant
    #[inline]
    #[must_use]
    pub fn property(&self) -> &PropertyPath {
        &self.property
    }

    /// Resolver that applies mappings to this edge
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> ResolverKind {
        self.resolver
    }

    /// Name-mapping selection
    #[inline]
    #[must_use]
    pub fn name_mapping(&self) -> MappingSelection {
        self.name_mapping
    }

    /// Value-mapping selection
    #[inline]
    #[must_use]
    pub fn value_mapping(&self) -> MappingSelection {
        self.value_mapping
    }

    /// Whether the dependency travels in the bundle
    #[inline]
    #[must_use]
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// Check if a mapping must be assigned before import
    #[must_use]
    pub fn requires_mapping(&self) -> bool {
        self.name_mapping == MappingSelection::Required
            || self.value_mapping == MappingSelection::Required
            || self.dependency.value_selection() == MappingSelection::Required
    }

    /// Replace the dependant side
    pub fn set_dependant(&mut self, dependant: EntityHeader) {
        self.dependant = dependant;
    }

    /// Replace the dependency side
    pub fn set_dependency(&mut self, dependency: EntityHeader) {
        self.dependency = dependency;
    }

    /// Replace the resolver
    pub fn set_resolver(&mut self, resolver: ResolverKind) {
        self.resolver = resolver;
    }
}

impl PartialEq for MigrationDependency {
    fn eq(&self, other: &Self) -> bool {
        self.dependant == other.dependant
            && self.dependency == other.dependency
            && self.property == other.property
    }
}

impl Eq for MigrationDependency {}

impl Hash for MigrationDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dependant.hash(state);
        self.dependency.hash(state);
        self.property.hash(state);
    }
}

impl Display for MigrationDependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.dependant, self.property, self.dependency)
    }
}
