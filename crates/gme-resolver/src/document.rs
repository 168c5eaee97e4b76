//! Resolver for documents attached to services
//!
//! A service does not hold its documents; each document points at its
//! service. Walking a service therefore searches the store for documents
//! and reports them as dependants, keyed by the document so that discovery
//! continues into it. Walking a document reports its service as usual.

use gme_graph::MigrationDependency;
use gme_model::{
    find_descriptor, DependencyDescriptor, Entity, EntityHeader, EntityKind, PropertyOwner,
    PropertyPath, PropertyValue, ResolverKind,
};
use gme_store::EntityFilter;

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

const MAX_DOCUMENTS: usize = 1000;

/// Links services and their documents in both directions
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceDocumentResolver;

impl PropertyResolver for ServiceDocumentResolver {
    fn kind(&self) -> ResolverKind {
        ResolverKind::ServiceDocument
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
        if owner.owner_kind() != Some(EntityKind::Service) {
            for header in read_property(owner, descriptor.property)?.headers() {
                let dependency =
                    MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
                insert_dependency(&mut map, header, dependency);
            }
            return Ok(map);
        }

        let filter = EntityFilter::new().with_attribute("service", source.id().as_str());
        for document in ctx
            .store
            .find_matching(EntityKind::ServiceDocument, &filter, 0, MAX_DOCUMENTS)?
        {
            let Some(back_reference) = find_descriptor(document.descriptors(), "service") else {
                continue;
            };
            let header = ctx.store.describe(&document);
            let dependency = MigrationDependency::new(
                header.clone(),
                source.clone(),
                PropertyPath::property(back_reference.property),
                back_reference,
            );
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
            Entity::Service(service) => write_property(
                owner,
                property,
                PropertyValue::Reference(EntityHeader::new(EntityKind::Service, service.id.clone())),
            ),
            other => Err(ResolverError::unsupported(
                property,
                format!("{} cannot own documents", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResolverRegistry;
    use gme_model::{Assertion, EntityId, Policy, Service, ServiceDocument};
    use gme_store::InMemoryEntityStore;
    use pretty_assertions::assert_eq;

    fn service(id: &str) -> Entity {
        Entity::Service(Service {
            id: EntityId::new(id),
            version: 0,
            name: id.into(),
            folder: None,
            routing_uri: Some(format!("/{id}")),
            http_methods: Vec::new(),
            soap: true,
            disabled: false,
            policy: Policy::new("svc", Assertion::All { children: Vec::new() }),
        })
    }

    fn document(id: &str, service: &str) -> Entity {
        Entity::ServiceDocument(ServiceDocument {
            id: EntityId::new(id),
            version: 0,
            service: EntityId::new(service),
            doc_type: "WSDL".into(),
            uri: format!("urn:{id}"),
            contents: String::new(),
        })
    }

    #[test]
    fn service_reports_its_documents_as_dependants() {
        let store = InMemoryEntityStore::with_entities([
            service("s1"),
            document("d1", "s1"),
            document("d2", "s1"),
            document("other", "s2"),
        ]);
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let entity = service("s1");
        let descriptor = *find_descriptor(entity.descriptors(), "documents").unwrap();
        let map = ServiceDocumentResolver
            .dependencies(&ctx, &entity.header(), &entity, &descriptor, &PropertyPath::property("documents"))
            .unwrap();

        let keys: Vec<&str> = map.keys().map(|h| h.id().as_str()).collect();
        assert_eq!(keys, vec!["d1", "d2"]);
        let edge = map[0].first().unwrap();
        assert_eq!(edge.dependant().id().as_str(), "d1");
        assert_eq!(edge.dependency(), &entity.header());
        assert_eq!(edge.property(), &PropertyPath::property("service"));
    }

    #[test]
    fn document_reports_its_service() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let entity = document("d1", "s1");
        let descriptor = entity.descriptors()[0];
        let map = ServiceDocumentResolver
            .dependencies(&ctx, &entity.header(), &entity, &descriptor, &PropertyPath::property("service"))
            .unwrap();
        assert_eq!(map.keys().next().unwrap(), &EntityHeader::new(EntityKind::Service, "s1"));
    }

    #[test]
    fn apply_moves_document_to_new_service() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut entity = document("d1", "s1");
        let target = service("s9");
        ServiceDocumentResolver
            .apply_mapping(
                &ctx,
                &mut entity,
                &PropertyPath::property("service"),
                &target.header(),
                &TargetValue::Entity(&target),
                &EntityHeader::new(EntityKind::Service, "s1"),
            )
            .unwrap();
        assert_eq!(entity, document("d1", "s9"));
    }
}
