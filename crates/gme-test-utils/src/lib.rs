//! Testing utilities for GME workspace
//!
//! Fixture builders for entities, stores and managers.

#![allow(missing_docs)]

use std::sync::Arc;

use gme_core::{MigrationConfig, MigrationManager};
use gme_model::{
    Assertion, ClusterProperty, Entity, EntityHeader, EntityId, Folder, JdbcConnection, Policy,
    ResourceEntry, SecurePassword, Service, ServiceDocument, User,
};
use gme_store::InMemoryEntityStore;

pub const ROOT_FOLDER_ID: &str = "root";

pub fn root_folder() -> Entity {
    Entity::Folder(Folder {
        id: EntityId::new(ROOT_FOLDER_ID),
        version: 0,
        name: "Root Node".into(),
        parent: None,
    })
}

pub fn folder(id: &str, name: &str, parent: &str) -> Entity {
    Entity::Folder(Folder {
        id: EntityId::new(id),
        version: 0,
        name: name.into(),
        parent: Some(EntityId::new(parent)),
    })
}

pub fn policy(id: &str, folder: Option<&str>, root: Assertion) -> Entity {
    let mut policy = Policy::new(id, root);
    policy.id = EntityId::new(id);
    policy.folder = folder.map(EntityId::new);
    Entity::Policy(policy)
}

pub fn all(children: Vec<Assertion>) -> Assertion {
    Assertion::All { children }
}

pub fn include(policy: &str) -> Assertion {
    Assertion::Include {
        policy: EntityId::new(policy),
    }
}

pub fn jdbc_query(connection: &str) -> Assertion {
    Assertion::JdbcQuery {
        connection: connection.into(),
        sql: "select 1".into(),
    }
}

pub fn specific_user(provider: &str, user: &str) -> Assertion {
    Assertion::SpecificUser {
        provider: EntityId::new(provider),
        user: EntityId::new(user),
        login: user.into(),
    }
}

pub fn jdbc_connection(id: &str, name: &str, url: &str) -> Entity {
    Entity::JdbcConnection(JdbcConnection {
        id: EntityId::new(id),
        version: 0,
        name: name.into(),
        driver_class: "com.mysql.jdbc.Driver".into(),
        jdbc_url: url.into(),
        user_name: "gateway".into(),
        password: None,
    })
}

pub fn secure_password(id: &str, name: &str) -> Entity {
    Entity::SecurePassword(SecurePassword {
        id: EntityId::new(id),
        version: 0,
        name: name.into(),
        encoded: "***".into(),
    })
}

pub fn cluster_property(id: &str, name: &str, value: &str) -> Entity {
    Entity::ClusterProperty(ClusterProperty {
        id: EntityId::new(id),
        version: 0,
        name: name.into(),
        value: value.into(),
    })
}

pub fn resource(id: &str, imports: &[&str]) -> Entity {
    Entity::ResourceEntry(ResourceEntry {
        id: EntityId::new(id),
        version: 0,
        uri: format!("urn:schema:{id}"),
        resource_type: "XML_SCHEMA".into(),
        content: format!("<schema id=\"{id}\"/>"),
        imports: imports.iter().map(|i| EntityId::new(*i)).collect(),
    })
}

pub fn user(id: &str, provider: &str) -> Entity {
    Entity::User(User {
        id: EntityId::new(id),
        version: 0,
        provider: EntityId::new(provider),
        login: id.into(),
    })
}

pub fn service(id: &str, folder: Option<&str>, routing_uri: &str, root: Assertion) -> Entity {
    let mut policy = Policy::new(format!("{id} policy"), root);
    policy.id = EntityId::new(format!("{id}-policy"));
    Entity::Service(Service {
        id: EntityId::new(id),
        version: 0,
        name: id.into(),
        folder: folder.map(EntityId::new),
        routing_uri: Some(routing_uri.into()),
        http_methods: vec!["GET".into(), "POST".into()],
        soap: false,
        disabled: false,
        policy,
    })
}

pub fn service_document(id: &str, service: &str) -> Entity {
    Entity::ServiceDocument(ServiceDocument {
        id: EntityId::new(id),
        version: 0,
        service: EntityId::new(service),
        doc_type: "WSDL".into(),
        uri: format!("urn:wsdl:{id}"),
        contents: String::new(),
    })
}

/// Store holding the root folder plus the given entities
pub fn store_with(entities: impl IntoIterator<Item = Entity>) -> Arc<InMemoryEntityStore> {
    let store = InMemoryEntityStore::with_entities([root_folder()]);
    for entity in entities {
        store.insert(entity);
    }
    Arc::new(store)
}

pub fn root_header() -> EntityHeader {
    root_folder().header().with_description("/")
}

pub fn manager_for(store: &Arc<InMemoryEntityStore>) -> MigrationManager {
    MigrationManager::new(store.clone(), Some(root_header()))
}

pub fn strict_manager_for(store: &Arc<InMemoryEntityStore>) -> MigrationManager {
    manager_for(store).with_config(MigrationConfig::new().with_strict_validation(true))
}

pub fn header(entity: &Entity) -> EntityHeader {
    entity.header()
}
