//! Recursive dependency discovery

use tracing::{debug, trace, warn};

use gme_graph::MigrationMetadata;
use gme_model::{Entity, EntityHeader, EntityKind, PropertyOwner, PropertyPath};
use gme_resolver::{merge_dependencies, DependencyMap};

use super::MigrationManager;
use crate::error::MigrationError;

impl MigrationManager {
    /// Walk one header and everything reachable from it
    ///
    /// Entities that cannot be loaded are kept as nodes without edges.
    /// Value references and dependencies that must be mapped onto the target
    /// are recorded but not walked.
    pub(super) fn find_dependencies_recursive(
        &self,
        metadata: &mut MigrationMetadata,
        header: &EntityHeader,
    ) -> Result<(), MigrationError> {
        if metadata.is_visited(header) {
            return Ok(());
        }
        let entity = match self.load_entity(header) {
            Ok(entity) => entity,
            Err(error) => {
                warn!(%header, %error, "unable to load entity, skipping its dependencies");
                metadata.add_node(header.clone());
                return Ok(());
            }
        };
        metadata.add_header(header.clone());
        if header.is_value_reference() {
            return Ok(());
        }
        trace!(%header, "walking entity");

        let found = self.collect_dependencies(header, &entity)?;
        let mut pending = Vec::new();
        for (key, edges) in found {
            let resolved = self.describe_dependency(&key);
            let mut follow = !resolved.is_value_reference();
            for mut edge in edges {
                if edge.dependency() == &key {
                    edge.set_dependency(resolved.clone());
                } else if edge.dependant() == &key {
                    edge.set_dependant(resolved.clone());
                }
                if edge.requires_mapping() && !self.config.follow_required_mappings {
                    follow = false;
                }
                debug!(%edge, "dependency recorded");
                metadata.add_dependency(edge);
            }
            if follow && !metadata.is_visited(&resolved) {
                pending.push(resolved);
            }
        }
        for next in pending {
            self.find_dependencies_recursive(metadata, &next)?;
        }
        Ok(())
    }

    /// Run every descriptor of an entity through its resolver
    ///
    /// Edges are stamped with the resolver that must apply their mappings,
    /// which for nested assertion properties is the resolver of the outer
    /// descriptor.
    pub(super) fn collect_dependencies(
        &self,
        source: &EntityHeader,
        entity: &Entity,
    ) -> Result<DependencyMap, MigrationError> {
        let ctx = self.context();
        let mut found = DependencyMap::new();
        for descriptor in entity.descriptors() {
            let effective = self
                .registry
                .effective_kind(entity.owner_kind(), descriptor.resolver);
            let resolver = self.registry.get(effective)?;
            let path = PropertyPath::property(descriptor.property);
            let mut map = resolver
                .dependencies(&ctx, source, entity, descriptor, &path)
                .map_err(|e| MigrationError::for_header("unable to resolve dependencies", source, e))?;
            for edges in map.values_mut() {
                *edges = std::mem::take(edges)
                    .into_iter()
                    .map(|mut edge| {
                        edge.set_resolver(effective);
                        edge
                    })
                    .collect();
            }
            merge_dependencies(&mut found, map);
        }
        Ok(found)
    }

    /// Canonical header of a dependency, or the header as given if it does not load
    fn describe_dependency(&self, header: &EntityHeader) -> EntityHeader {
        if header.is_value_reference() {
            return header.clone();
        }
        match self.load_entity(header) {
            Ok(entity) => self.resolve_header(header, &entity),
            Err(error) => {
                trace!(%header, %error, "dependency not described");
                header.clone()
            }
        }
    }

    /// Documents travel with their service, so they become roots too
    pub(super) fn promote_documents(&self, metadata: &mut MigrationMetadata, service: &EntityHeader) {
        let documents: Vec<EntityHeader> = metadata
            .dependants(service)
            .into_iter()
            .map(|edge| edge.dependant().clone())
            .filter(|header| header.kind() == EntityKind::ServiceDocument)
            .collect();
        for document in documents {
            if metadata.add_root(document.clone()) {
                debug!(%service, %document, "service document promoted to root");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use gme_model::{EntityId, ResourceEntry};
    use gme_store::InMemoryEntityStore;

    fn resource(id: &str, imports: &[&str]) -> Entity {
        Entity::ResourceEntry(ResourceEntry {
            id: EntityId::new(id),
            version: 0,
            uri: format!("urn:{id}"),
            resource_type: "XML_SCHEMA".into(),
            content: String::new(),
            imports: imports.iter().map(|i| EntityId::new(*i)).collect(),
        })
    }

    fn manager(entities: Vec<Entity>) -> MigrationManager {
        MigrationManager::new(Arc::new(InMemoryEntityStore::with_entities(entities)), None)
    }

    #[test]
    fn missing_dependency_is_kept_as_node() {
        let manager = manager(vec![resource("a", &["gone"])]);
        let metadata = manager
            .find_dependencies(&[EntityHeader::new(EntityKind::ResourceEntry, "a")])
            .unwrap();
        assert_eq!(metadata.node_count(), 2);
        assert_eq!(metadata.edge_count(), 1);
        assert!(!metadata.is_visited(&EntityHeader::new(EntityKind::ResourceEntry, "gone")));
    }

    #[test]
    fn dependencies_are_described_by_the_store() {
        let manager = manager(vec![resource("a", &["b"]), resource("b", &[])]);
        let metadata = manager
            .find_dependencies(&[EntityHeader::new(EntityKind::ResourceEntry, "a")])
            .unwrap();
        let b = metadata
            .header(&EntityHeader::new(EntityKind::ResourceEntry, "b"))
            .unwrap();
        assert_eq!(b.name(), Some("urn:b"));
        assert_eq!(b.extra_property("resourceType"), Some("XML_SCHEMA"));
    }
}
