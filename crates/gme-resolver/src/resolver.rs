//! Property resolver trait and shared types
//!
//! A [`PropertyResolver`] knows how one family of dependency-bearing
//! properties refers to other entities. It is used in both directions:
//! discovery asks it which entities a property depends on, import asks it to
//! point the property at a target-side entity or value.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, Entity, EntityHeader, PropertyOwner, PropertyPath, PropertyValue,
    ResolverKind,
};
use gme_store::EntityStore;

use crate::error::ResolverError;
use crate::registry::ResolverRegistry;

/// Dependencies found for one property, keyed by the header that discovery
/// should continue from
pub type DependencyMap = IndexMap<EntityHeader, IndexSet<MigrationDependency>>;

/// Record an edge under a key header
pub fn insert_dependency(map: &mut DependencyMap, key: EntityHeader, dependency: MigrationDependency) {
    map.entry(key).or_default().insert(dependency);
}

/// Merge the entries of one map into another
pub fn merge_dependencies(into: &mut DependencyMap, from: DependencyMap) {
    for (key, dependencies) in from {
        into.entry(key).or_default().extend(dependencies);
    }
}

/// Collaborators available to resolvers
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Store of the cluster being walked or written
    pub store: &'a dyn EntityStore,
    /// Registry, for resolvers that delegate
    pub registry: &'a ResolverRegistry,
}

impl<'a> ResolveContext<'a> {
    /// Create new context
    #[must_use]
    pub fn new(store: &'a dyn EntityStore, registry: &'a ResolverRegistry) -> Self {
        Self { store, registry }
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// New value for a mapped dependency
#[derive(Debug, Clone, Copy)]
pub enum TargetValue<'a> {
    /// Target-side entity
    Entity(&'a Entity),
    /// Literal replacement value
    Literal(&'a str),
}

/// Strategy for one family of dependency-bearing properties
pub trait PropertyResolver: Send + Sync + fmt::Debug {
    /// Which family this resolver handles
    fn kind(&self) -> ResolverKind;

    /// Find the dependencies of one property
    ///
    /// `source` is the header of the entity being walked, `owner` the entity or
    /// assertion holding the property and `path` the full location of the
    /// property inside `source`.
    ///
    /// # Errors
    /// Returns an error when the property cannot be read or a lookup fails.
    fn dependencies(
        &self,
        ctx: &ResolveContext<'_>,
        source: &EntityHeader,
        owner: &dyn PropertyOwner,
        descriptor: &DependencyDescriptor,
        path: &PropertyPath,
    ) -> Result<DependencyMap, ResolverError>;

    /// Point a property at a new target
    ///
    /// `original` is the source-side header the property referenced, used to
    /// pick the right element of multi-valued properties.
    ///
    /// # Errors
    /// Returns an error when the value cannot be written.
    fn apply_mapping(
        &self,
        ctx: &ResolveContext<'_>,
        owner: &mut dyn PropertyOwner,
        path: &PropertyPath,
        target_header: &EntityHeader,
        target_value: &TargetValue<'_>,
        original: &EntityHeader,
    ) -> Result<(), ResolverError>;
}

/// Read a property, attaching owner and property to the error
pub(crate) fn read_property(
    owner: &dyn PropertyOwner,
    property: &str,
) -> Result<PropertyValue, ResolverError> {
    owner.property(property).map_err(|source| ResolverError::Read {
        owner: owner.owner_label(),
        property: property.to_string(),
        source,
    })
}

/// Write a property, attaching owner and property to the error
pub(crate) fn write_property(
    owner: &mut dyn PropertyOwner,
    property: &str,
    value: PropertyValue,
) -> Result<(), ResolverError> {
    owner.set_property(property, value).map_err(|source| ResolverError::Write {
        owner: owner.owner_label(),
        property: property.to_string(),
        source,
    })
}

/// Property name a non-nested resolver writes to
pub(crate) fn leaf_property(path: &PropertyPath) -> Result<&str, ResolverError> {
    path.last_property()
        .ok_or_else(|| ResolverError::InvalidPath(path.to_string()))
}

/// Target-side entity, or an error naming the property
pub(crate) fn target_entity<'a>(
    target_value: &TargetValue<'a>,
    property: &str,
) -> Result<&'a Entity, ResolverError> {
    match *target_value {
        TargetValue::Entity(entity) => Ok(entity),
        TargetValue::Literal(_) => Err(ResolverError::unsupported(
            property,
            "a literal value cannot replace an entity reference",
        )),
    }
}
