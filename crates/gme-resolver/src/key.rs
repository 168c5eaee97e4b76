//! Resolver for private keys referenced by keystore and alias

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, Entity, EntityHeader, EntityKind, PropertyOwner, PropertyPath,
    PropertyValue, ResolverKind,
};

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

/// Turns `keystore:alias` references into private key headers
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivateKeyResolver;

impl PropertyResolver for PrivateKeyResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::PrivateKey
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
        // An unset key means the cluster default key, which every cluster has.
        if let PropertyValue::Key(key) = read_property(owner, descriptor.property)? {
            let header = EntityHeader::new(EntityKind::PrivateKey, key.entity_id()).with_name(key.alias.clone());
            let dependency = MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
            insert_dependency(&mut map, header, dependency);
        }
        Ok(map)
    }

    fn apply_mapping(
        &self,
        _ctx: &ResolveContext<'_>,
        owner: &mut dyn PropertyOwner,
        path: &PropertyPath,
        _target_header: &EntityHeader,
        target_value: &TargetValue<'_>,
        _original: &EntityHeader,
    ) -> Result<(), ResolverError> {
        let property = leaf_property(path)?;
        match target_entity(target_value, property)? {
            Entity::PrivateKey(key) => write_property(owner, property, PropertyValue::Key(key.key.clone())),
            other => Err(ResolverError::unsupported(
                property,
                format!("expected {}, got {}", EntityKind::PrivateKey, other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResolverRegistry;
    use gme_model::{Assertion, KeyReference, PrivateKey};
    use gme_store::InMemoryEntityStore;

    #[test]
    fn default_key_has_no_dependency() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let assertion = Assertion::SignResponse { key: None };
        let map = PrivateKeyResolver
            .dependencies(
                &ctx,
                &EntityHeader::new(EntityKind::Policy, "p"),
                &assertion,
                &assertion.descriptors()[0],
                &PropertyPath::property("key"),
            )
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn key_maps_to_target_alias() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut assertion = Assertion::SignResponse {
            key: Some(KeyReference::new("ks1", "old")),
        };
        let descriptor = assertion.descriptors()[0];
        let map = PrivateKeyResolver
            .dependencies(
                &ctx,
                &EntityHeader::new(EntityKind::Policy, "p"),
                &assertion,
                &descriptor,
                &PropertyPath::property("key"),
            )
            .unwrap();
        let original = map.keys().next().unwrap().clone();
        assert_eq!(original.id().as_str(), "ks1:old");

        let target = Entity::PrivateKey(PrivateKey {
            key: KeyReference::new("ks2", "new"),
            version: 0,
            subject_dn: String::new(),
        });
        PrivateKeyResolver
            .apply_mapping(
                &ctx,
                &mut assertion,
                &PropertyPath::property("key"),
                &target.header(),
                &TargetValue::Entity(&target),
                &original,
            )
            .unwrap();
        assert_eq!(
            assertion,
            Assertion::SignResponse {
                key: Some(KeyReference::new("ks2", "new"))
            }
        );
    }
}
