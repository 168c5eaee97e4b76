//! Resolver for cluster properties referenced from expressions
//!
//! Expressions reach cluster properties through `${gateway.<name>}`. Every
//! such reference that names an existing cluster property becomes a
//! dependency; unknown names are built-in variables and are skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, Entity, EntityHeader, EntityKind, PropertyOwner, PropertyPath,
    PropertyValue, ResolverKind,
};
use gme_store::EntityFilter;

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

static GATEWAY_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{gateway\.([A-Za-z0-9_.\-]+)\}")
        .unwrap_or_else(|_| unreachable!("static pattern compiles"))
});

/// Cluster property names referenced by an expression, in order of appearance
#[must_use]
pub fn referenced_properties(expression: &str) -> Vec<&str> {
    GATEWAY_VARIABLE
        .captures_iter(expression)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect()
}

/// Finds cluster properties used by `${gateway.*}` expressions
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerVariableResolver;

impl PropertyResolver for ServerVariableResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::ServerVariable
    }

    fn dependencies(
        &self,
        ctx: &ResolveContext<'_>,
        source: &EntityHeader,
        owner: &dyn PropertyOwner,
        descriptor: &DependencyDescriptor,
        path: &PropertyPath,
    ) -> Result<DependencyMap, ResolverError> {
        let mut map = DependencyMap::new();
        let value = read_property(owner, descriptor.property)?;
        let Some(expression) = value.as_text() else {
            return Ok(map);
        };
        for name in referenced_properties(expression) {
            let filter = EntityFilter::new().with_attribute("name", name);
            match ctx
                .store
                .find_matching(EntityKind::ClusterProperty, &filter, 0, 1)?
                .first()
            {
                Some(property) => {
                    let header = ctx.store.describe(property);
                    let dependency =
                        MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
                    insert_dependency(&mut map, header, dependency);
                }
                None => trace!(%source, name, "no cluster property, treating as built-in variable"),
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
        original: &EntityHeader,
    ) -> Result<(), ResolverError> {
        let property = leaf_property(path)?;
        let Entity::ClusterProperty(target) = target_entity(target_value, property)? else {
            return Err(ResolverError::unsupported(property, "target is not a cluster property"));
        };
        let old_name = original
            .name()
            .ok_or_else(|| ResolverError::unsupported(property, "source cluster property has no name"))?;
        let PropertyValue::Text(expression) = read_property(owner, property)? else {
            return Err(ResolverError::unsupported(property, "property is not an expression"));
        };
        let rewritten = expression.replace(
            &format!("${{gateway.{old_name}}}"),
            &format!("${{gateway.{}}}", target.name),
        );
        write_property(owner, property, PropertyValue::Text(rewritten))
    }
}
