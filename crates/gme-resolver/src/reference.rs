//! Resolver for direct entity references

use gme_graph::MigrationDependency;
use gme_model::{DependencyDescriptor, EntityHeader, PropertyOwner, PropertyPath, PropertyValue, ResolverKind};

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

/// Reads single or list references straight from the property
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl PropertyResolver for DefaultResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Default
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
        for header in read_property(owner, descriptor.property)?.headers() {
            let dependency =
                MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
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
        original: &EntityHeader,
    ) -> Result<(), ResolverError> {
        let property = leaf_property(path)?;
        let replacement = target_entity(target_value, property)?.header();
        let value = match read_property(owner, property)? {
            PropertyValue::References(headers) => PropertyValue::References(
                headers
                    .into_iter()
                    .map(|header| if header == *original { replacement.clone() } else { header })
                    .collect(),
            ),
            PropertyValue::Reference(_) | PropertyValue::Empty => PropertyValue::Reference(replacement),
            PropertyValue::Text(_) | PropertyValue::Key(_) => {
                return Err(ResolverError::unsupported(property, "property does not hold references"));
            }
        };
        write_property(owner, property, value)
    }
}
