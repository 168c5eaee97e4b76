//! Resolver for assertion trees
//!
//! Walks every assertion of the owner's policy in pre-order and hands each
//! dependency-bearing assertion property to the resolver its descriptor
//! names. Paths are extended with the assertion ordinal so that mappings can
//! find the same assertion again.

use tracing::trace;

use gme_model::{
    find_descriptor, DependencyDescriptor, EntityHeader, ModelError, PropertyOwner, PropertyPath,
    ResolverKind,
};

use crate::error::ResolverError;
use crate::resolver::{merge_dependencies, DependencyMap, PropertyResolver, ResolveContext, TargetValue};

/// Delegates to the resolvers of individual assertions
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyResolver;

impl PropertyResolver for PolicyResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Policy
    }

    fn dependencies(
        &self,
        ctx: &ResolveContext<'_>,
        source: &EntityHeader,
        owner: &dyn PropertyOwner,
        _descriptor: &DependencyDescriptor,
        path: &PropertyPath,
    ) -> Result<DependencyMap, ResolverError> {
        let mut map = DependencyMap::new();
        let Some(policy) = owner.policy() else {
            return Ok(map);
        };
        for (ordinal, assertion) in policy.assertions() {
            for descriptor in assertion.descriptors() {
                let resolver = ctx.registry.resolver_for(None, descriptor.resolver)?;
                let nested = path.child_assertion(ordinal).child_property(descriptor.property);
                trace!(%source, path = %nested, "resolving assertion property");
                let found = resolver.dependencies(ctx, source, assertion, descriptor, &nested)?;
                merge_dependencies(&mut map, found);
            }
        }
        Ok(map)
    }

    fn apply_mapping(
        &self,
        ctx: &ResolveContext<'_>,
        owner: &mut dyn PropertyOwner,
        path: &PropertyPath,
        target_header: &EntityHeader,
        target_value: &TargetValue<'_>,
        original: &EntityHeader,
    ) -> Result<(), ResolverError> {
        let (ordinal, rest) = path
            .nested_assertion()
            .ok_or_else(|| ResolverError::InvalidPath(path.to_string()))?;
        let property = rest
            .first_property()
            .ok_or_else(|| ResolverError::InvalidPath(path.to_string()))?;
        let policy = owner
            .policy_mut()
            .ok_or_else(|| ResolverError::InvalidPath(path.to_string()))?;
        let assertion = policy
            .assertion_mut(ordinal)
            .ok_or(ModelError::AssertionNotFound(ordinal))?;
        let descriptor = *find_descriptor(assertion.descriptors(), property).ok_or_else(|| {
            ModelError::unknown_property(assertion.owner_label(), property)
        })?;
        let resolver = ctx.registry.resolver_for(None, descriptor.resolver)?;
        resolver.apply_mapping(ctx, assertion, &rest, target_header, target_value, original)
    }
}
