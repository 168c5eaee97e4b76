//! Resolver for users and groups inside identity providers
//!
//! Identities cannot be copied between clusters, so user and group
//! dependencies always require a name mapping. When a user or group is
//! present its provider is implied and no separate provider edge is emitted.

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, Entity, EntityHeader, EntityKind, MappingSelection, PropertyOwner,
    PropertyPath, PropertyValue, ResolverKind,
};

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

fn is_member(header: &EntityHeader) -> bool {
    matches!(header.kind(), EntityKind::User | EntityKind::Group)
}

/// Emits user and group dependencies with required name mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct UserGroupResolver;

impl PropertyResolver for UserGroupResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::UserGroup
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
        let headers = read_property(owner, descriptor.property)?.headers();
        let has_member = headers.iter().any(is_member);
        for header in headers {
            let dependency =
                MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
            if is_member(&header) {
                insert_dependency(
                    &mut map,
                    header,
                    dependency.with_name_mapping(MappingSelection::Required),
                );
            } else if !has_member {
                insert_dependency(&mut map, header, dependency);
            }
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
        let replacement = match target_entity(target_value, property)? {
            Entity::User(user) => vec![
                EntityHeader::new(EntityKind::IdentityProvider, user.provider.clone()),
                EntityHeader::new(EntityKind::User, user.id.clone()).with_name(user.login.clone()),
            ],
            Entity::Group(group) => vec![
                EntityHeader::new(EntityKind::IdentityProvider, group.provider.clone()),
                EntityHeader::new(EntityKind::Group, group.id.clone()).with_name(group.name.clone()),
            ],
            Entity::IdentityProvider(provider) => {
                vec![EntityHeader::new(EntityKind::IdentityProvider, provider.id.clone())]
            }
            other => {
                return Err(ResolverError::unsupported(
                    property,
                    format!("{} is not an identity", other.kind()),
                ));
            }
        };
        let value = match read_property(owner, property)? {
            PropertyValue::Reference(_) if replacement.len() == 1 => {
                PropertyValue::Reference(replacement[0].clone())
            }
            _ => PropertyValue::References(replacement),
        };
        write_property(owner, property, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResolverRegistry;
    use gme_model::{Assertion, EntityId, User};
    use gme_store::InMemoryEntityStore;

    fn specific_user() -> Assertion {
        Assertion::SpecificUser {
            provider: EntityId::new("idp"),
            user: EntityId::new("u1"),
            login: "alice".into(),
        }
    }

    #[test]
    fn user_suppresses_provider_and_requires_mapping() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let assertion = specific_user();
        let map = UserGroupResolver
            .dependencies(
                &ctx,
                &EntityHeader::new(EntityKind::Policy, "p"),
                &assertion,
                &assertion.descriptors()[0],
                &"assertions/#1/identity".parse().unwrap(),
            )
            .unwrap();
        assert_eq!(map.len(), 1);
        let (header, edges) = map.first().unwrap();
        assert_eq!(header.kind(), EntityKind::User);
        assert!(edges
            .iter()
            .all(|e| e.name_mapping() == MappingSelection::Required));
    }

    #[test]
    fn apply_points_at_target_user() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut assertion = specific_user();
        let target = Entity::User(User {
            id: EntityId::new("u7"),
            version: 0,
            provider: EntityId::new("idp2"),
            login: "alice.prod".into(),
        });
        UserGroupResolver
            .apply_mapping(
                &ctx,
                &mut assertion,
                &PropertyPath::property("identity"),
                &target.header(),
                &TargetValue::Entity(&target),
                &EntityHeader::new(EntityKind::User, "u1"),
            )
            .unwrap();
        assert_eq!(
            assertion,
            Assertion::SpecificUser {
                provider: EntityId::new("idp2"),
                user: EntityId::new("u7"),
                login: "alice.prod".into(),
            }
        );
    }
}
