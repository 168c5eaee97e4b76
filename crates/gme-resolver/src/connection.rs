//! Resolver for connections referenced by name
//!
//! Query assertions name their JDBC or Cassandra connection instead of
//! holding its identity. Names that are context-variable expressions are
//! only known at runtime and produce no dependency.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use gme_graph::MigrationDependency;
use gme_model::{
    DependencyDescriptor, EntityHeader, EntityKind, PropertyOwner, PropertyPath, PropertyValue,
    ResolverKind,
};
use gme_store::EntityFilter;

use crate::error::ResolverError;
use crate::resolver::{
    insert_dependency, leaf_property, read_property, target_entity, write_property, DependencyMap,
    PropertyResolver, ResolveContext, TargetValue,
};

static VARIABLE_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{[^}]+\}").unwrap_or_else(|_| unreachable!("static pattern compiles"))
});

/// Check if a value references a context variable
#[must_use]
pub fn is_variable_expression(value: &str) -> bool {
    VARIABLE_EXPRESSION.is_match(value)
}

/// Looks connections up by name on the store being walked
#[derive(Debug, Clone, Copy)]
pub struct ConnectionResolver {
    kind: ResolverKind,
    entity_kind: EntityKind,
}

impl ConnectionResolver {
    /// Resolver for JDBC connections
    #[must_use]
    pub fn jdbc() -> Self {
        Self {
            kind: ResolverKind::JdbcConnection,
            entity_kind: EntityKind::JdbcConnection,
        }
    }

    /// Resolver for Cassandra connections
    #[must_use]
    pub fn cassandra() -> Self {
        Self {
            kind: ResolverKind::CassandraConnection,
            entity_kind: EntityKind::CassandraConnection,
        }
    }
}

impl PropertyResolver for ConnectionResolver {
    fn kind(&self) -> ResolverKind {
        self.kind
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
        let Some(name) = value.as_text().filter(|name| !name.is_empty()) else {
            return Ok(map);
        };
        if is_variable_expression(name) {
            trace!(%source, %path, name, "connection name is an expression, skipping");
            return Ok(map);
        }

        let filter = EntityFilter::new().with_attribute("name", name);
        let header = match ctx.store.find_matching(self.entity_kind, &filter, 0, 1)?.first() {
            Some(connection) => ctx.store.describe(connection),
            None => {
                debug!(%source, name, kind = %self.entity_kind, "named connection not found");
                EntityHeader::new(self.entity_kind, name).with_name(name)
            }
        };
        let dependency = MigrationDependency::new(source.clone(), header.clone(), path.clone(), descriptor);
        insert_dependency(&mut map, header, dependency);
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
        let connection = target_entity(target_value, property)?;
        if connection.kind() != self.entity_kind {
            return Err(ResolverError::unsupported(
                property,
                format!("expected {}, got {}", self.entity_kind, connection.kind()),
            ));
        }
        write_property(owner, property, PropertyValue::Text(connection.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResolverRegistry;
    use gme_model::{Assertion, Entity, EntityId, JdbcConnection};
    use gme_store::InMemoryEntityStore;

    fn connection(id: &str, name: &str) -> Entity {
        Entity::JdbcConnection(JdbcConnection {
            id: EntityId::new(id),
            version: 0,
            name: name.into(),
            driver_class: String::new(),
            jdbc_url: "jdbc:h2:mem".into(),
            user_name: String::new(),
            password: None,
        })
    }

    fn query(connection: &str) -> Assertion {
        Assertion::JdbcQuery {
            connection: connection.into(),
            sql: "select 1".into(),
        }
    }

    fn resolve(store: &InMemoryEntityStore, assertion: &Assertion) -> DependencyMap {
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(store, &registry);
        ConnectionResolver::jdbc()
            .dependencies(
                &ctx,
                &EntityHeader::new(EntityKind::Policy, "p"),
                assertion,
                &assertion.descriptors()[0],
                &"assertions/#1/connection".parse().unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn expressions_are_detected() {
        assert!(is_variable_expression("${request.db}"));
        assert!(is_variable_expression("db-${env}"));
        assert!(!is_variable_expression("orders"));
        assert!(!is_variable_expression("$notvar"));
    }

    #[test]
    fn named_connection_resolves_to_its_identity() {
        let store = InMemoryEntityStore::with_entities([connection("c1", "orders")]);
        let map = resolve(&store, &query("orders"));
        assert_eq!(map.len(), 1);
        let header = map.keys().next().unwrap();
        assert_eq!(header.id().as_str(), "c1");
        assert_eq!(header.name(), Some("orders"));
    }

    #[test]
    fn expression_name_yields_nothing() {
        let store = InMemoryEntityStore::with_entities([connection("c1", "orders")]);
        assert!(resolve(&store, &query("${ctx.db}")).is_empty());
    }

    #[test]
    fn unknown_name_keeps_a_named_header() {
        let store = InMemoryEntityStore::new();
        let map = resolve(&store, &query("missing"));
        assert_eq!(map.keys().next().unwrap().name(), Some("missing"));
    }

    #[test]
    fn apply_writes_target_name() {
        let store = InMemoryEntityStore::new();
        let registry = ResolverRegistry::with_defaults();
        let ctx = ResolveContext::new(&store, &registry);
        let mut assertion = query("orders");
        let target = connection("c9", "orders-prod");
        ConnectionResolver::jdbc()
            .apply_mapping(
                &ctx,
                &mut assertion,
                &PropertyPath::property("connection"),
                &target.header(),
                &TargetValue::Entity(&target),
                &EntityHeader::new(EntityKind::JdbcConnection, "c1"),
            )
            .unwrap();
        assert_eq!(assertion, query("orders-prod"));
    }
}
