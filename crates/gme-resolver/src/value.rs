//! Resolver for literal values that may need replacing on the target
//!
//! The value itself becomes a synthetic value-reference header whose identity
//! is derived from the owner and the path, so an operator can assign a
//! replacement or point it at the equivalent value of another entity.

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, EntityHeader, PropertyOwner, PropertyPath, PropertyValue, ResolverKind,
    ValueReference,
};

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

/// Exposes literal values as mappable headers
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueReferenceResolver;

impl PropertyResolver for ValueReferenceResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::ValueReference
    }

    fn dependencies(
        &self,
        _ctx: &ResolveContext<'_>,
        source: &EntityHeader,
        owner: &dyn PropertyOwner,
        descriptor: &DependencyDescriptor,
        path: &PropertyPath,
    ) -> Result<DependencyMap, ResolverError> {
        let mut map = DependencyMap::new();
        let value = read_property(owner, descriptor.property)?;
        let Some(text) = value.as_text() else {
            return Ok(map);
        };
        let reference = ValueReference::new(source.kind(), source.id().clone(), path.clone());
        let header = EntityHeader::value_reference(reference, text, descriptor.value_mapping);
        let dependency = MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
        insert_dependency(&mut map, header, dependency);
        Ok(map)
    }

    fn apply_mapping(
        &self,
        _ctx: &ResolveContext<'_>,
        owner: &mut dyn PropertyOwner,
        path: &PropertyPath,
        target_header: &EntityHeader,
        target_value: &TargetValue<'_>,
        _original: &EntityHeader,
    ) -> Result<(), ResolverError> {
        let property = leaf_property(path)?;
        let replacement = match *target_value {
            TargetValue::Literal(value) => value.to_string(),
            TargetValue::Entity(entity) => {
                let reference = target_header.value_ref().ok_or_else(|| {
                    ResolverError::unsupported(property, "target header is not a value reference")
                })?;
                let value = entity.property_at(&reference.path)?;
                value
                    .as_text()
                    .ok_or_else(|| {
                        ResolverError::unsupported(property, "target value is not a literal")
                    })?
                    .to_string()
            }
        };
        write_property(owner, property, PropertyValue::Text(replacement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResolverRegistry;
    use gme_model::{Entity, EntityId, EntityKind, JdbcConnection, MappingSelection};
    use gme_store::InMemoryEntityStore;
    use pretty_assertions::assert_eq;

    fn connection(id: &str, url: &str) -> Entity {
        Entity::JdbcConnection(JdbcConnection {
            id: EntityId::new(id),
            version: 0,
            name: id.into(),
            driver_class: String::new(),
            jdbc_url: url.into(),
            user_name: String::new(),
            password: None,
        })
    }

    #[test]
    fn value_becomes_reference_header() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let entity = connection("c1", "jdbc:mysql://source/db");
        let descriptor = entity.descriptors()[0];
        let map = ValueReferenceResolver
            .dependencies(&ctx, &entity.header(), &entity, &descriptor, &PropertyPath::property("url"))
            .unwrap();
        let header = map.keys().next().unwrap();
        assert_eq!(header.kind(), EntityKind::ValueReference);
        assert_eq!(header.id().as_str(), "JDBC_CONNECTION:c1:url");
        assert_eq!(header.value_selection(), MappingSelection::Optional);
        assert_eq!(
            header.value_mapping().unwrap().display_value.as_deref(),
            Some("jdbc:mysql://source/db")
        );
    }

    #[test]
    fn literal_replacement_is_written() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut entity = connection("c1", "jdbc:mysql://source/db");
        let header = EntityHeader::new(EntityKind::ValueReference, "x");
        ValueReferenceResolver
            .apply_mapping(
                &ctx,
                &mut entity,
                &PropertyPath::property("url"),
                &header,
                &TargetValue::Literal("jdbc:mysql://target/db"),
                &header,
            )
            .unwrap();
        assert_eq!(entity, connection("c1", "jdbc:mysql://target/db"));
    }

    #[test]
    fn value_is_copied_from_target_owner() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut entity = connection("c1", "jdbc:mysql://source/db");
        let target = connection("c9", "jdbc:mysql://prod/db");
        let target_header = EntityHeader::value_reference(
            ValueReference::new(EntityKind::JdbcConnection, EntityId::new("c9"), PropertyPath::property("url")),
            "jdbc:mysql://prod/db",
            MappingSelection::Optional,
        );
        ValueReferenceResolver
            .apply_mapping(
                &ctx,
                &mut entity,
                &PropertyPath::property("url"),
                &target_header,
                &TargetValue::Entity(&target),
                &target_header,
            )
            .unwrap();
        assert_eq!(entity, connection("c1", "jdbc:mysql://prod/db"));
    }
}
