//! Gateway entities
//!
//! [`Entity`] is the full configuration object behind a header. Each variant
//! declares its dependency-bearing properties through [`PropertyOwner`], which
//! is all the resolvers ever see of it.

use serde::{Deserialize, Serialize};

use crate::descriptor::{DependencyDescriptor, ResolverKind};
use crate::error::ModelError;
use crate::header::{EntityHeader, MappingSelection};
use crate::kind::{EntityId, EntityKind};
use crate::path::PropertyPath;
use crate::policy::{KeyReference, Policy};
use crate::value::{PropertyOwner, PropertyValue};

/// Folder in the organisational tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name
    pub name: String,
    /// Parent folder, `None` for the root folder
    #[serde(default)]
    pub parent: Option<EntityId>,
}

/// Published service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name
    pub name: String,
    /// Containing folder
    #[serde(default)]
    pub folder: Option<EntityId>,
    /// Resolution path, e.g. `/orders/*`
    #[serde(default)]
    pub routing_uri: Option<String>,
    /// Accepted HTTP methods, all when empty
    #[serde(default)]
    pub http_methods: Vec<String>,
    /// Whether the service is resolved by SOAP operation
    #[serde(default)]
    pub soap: bool,
    /// Disabled services take no traffic
    #[serde(default)]
    pub disabled: bool,
    /// Embedded service policy
    pub policy: Policy,
}

impl Service {
    /// Check if the service takes part in request resolution
    #[must_use]
    pub fn is_routable(&self) -> bool {
        !self.disabled && self.routing_uri.is_some()
    }
}

/// Document attached to a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDocument {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Owning service
    pub service: EntityId,
    /// Document type, e.g. `WSDL` or `XSD`
    pub doc_type: String,
    /// Source URI
    pub uri: String,
    /// Content
    #[serde(default)]
    pub contents: String,
}

/// Identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProvider {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name
    pub name: String,
    /// Provider type, e.g. `INTERNAL` or `LDAP`
    pub provider_type: String,
    /// Bind password for directory providers
    #[serde(default)]
    pub bind_password: Option<EntityId>,
}

/// User inside an identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Owning identity provider
    pub provider: EntityId,
    /// Login
    pub login: String,
}

/// Group inside an identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Owning identity provider
    pub provider: EntityId,
    /// Name
    pub name: String,
}

/// JDBC connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JdbcConnection {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name, referenced by query assertions
    pub name: String,
    /// Driver class
    #[serde(default)]
    pub driver_class: String,
    /// Connection URL
    pub jdbc_url: String,
    /// Database user
    #[serde(default)]
    pub user_name: String,
    /// Stored password
    #[serde(default)]
    pub password: Option<EntityId>,
}

/// Cassandra connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CassandraConnection {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name, referenced by query assertions
    pub name: String,
    /// Keyspace
    #[serde(default)]
    pub keyspace: String,
    /// Contact points
    #[serde(default)]
    pub contact_points: Vec<String>,
    /// Stored password
    #[serde(default)]
    pub password: Option<EntityId>,
}

/// Private key, identified by keystore and alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateKey {
    /// Keystore and alias
    pub key: KeyReference,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Certificate subject
    #[serde(default)]
    pub subject_dn: String,
}

/// Cluster-wide property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProperty {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name, referenced as `${gateway.<name>}`
    pub name: String,
    /// Value
    pub value: String,
}

/// Global resource such as an XML schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// System identifier
    pub uri: String,
    /// Resource type, e.g. `XML_SCHEMA` or `DTD`
    pub resource_type: String,
    /// Content
    #[serde(default)]
    pub content: String,
    /// Resources imported by this one
    #[serde(default)]
    pub imports: Vec<EntityId>,
}

/// Stored secure password
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurePassword {
    /// Identity
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name
    pub name: String,
    /// Encrypted value
    #[serde(default)]
    pub encoded: String,
}

/// Any gateway configuration entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entity {
    /// Folder
    Folder(Folder),
    /// Policy
    Policy(Policy),
    /// Service
    Service(Service),
    /// Service document
    ServiceDocument(ServiceDocument),
    /// Identity provider
    IdentityProvider(IdentityProvider),
    /// User
    User(User),
    /// Group
    Group(Group),
    /// JDBC connection
    JdbcConnection(JdbcConnection),
    /// Cassandra connection
    CassandraConnection(CassandraConnection),
    /// Private key
    PrivateKey(PrivateKey),
    /// Cluster property
    ClusterProperty(ClusterProperty),
    /// Resource entry
    ResourceEntry(ResourceEntry),
    /// Secure password
    SecurePassword(SecurePassword),
}

static FOLDER_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("parent", ResolverKind::Default).target(EntityKind::Folder)];

static POLICY_DEPENDENCIES: &[DependencyDescriptor] = &[
    DependencyDescriptor::new("folder", ResolverKind::Default).target(EntityKind::Folder),
    DependencyDescriptor::new("assertions", ResolverKind::Policy),
];

static SERVICE_DEPENDENCIES: &[DependencyDescriptor] = &[
    DependencyDescriptor::new("folder", ResolverKind::Default).target(EntityKind::Folder),
    DependencyDescriptor::new("policy", ResolverKind::Policy),
    DependencyDescriptor::new("documents", ResolverKind::ServiceDocument)
        .target(EntityKind::ServiceDocument)
        .name_mapping(MappingSelection::None),
];

static SERVICE_DOCUMENT_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("service", ResolverKind::Default)
        .target(EntityKind::Service)
        .name_mapping(MappingSelection::None)];

static IDENTITY_PROVIDER_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("bind_password", ResolverKind::Default).target(EntityKind::SecurePassword)];

static MEMBER_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("provider", ResolverKind::Default).target(EntityKind::IdentityProvider)];

static JDBC_DEPENDENCIES: &[DependencyDescriptor] = &[
    DependencyDescriptor::new("url", ResolverKind::ValueReference)
        .name_mapping(MappingSelection::None)
        .value_mapping(MappingSelection::Optional),
    DependencyDescriptor::new("password", ResolverKind::Default).target(EntityKind::SecurePassword),
];

static CASSANDRA_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("password", ResolverKind::Default).target(EntityKind::SecurePassword)];

static RESOURCE_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("imports", ResolverKind::Default).target(EntityKind::ResourceEntry)];

static NO_DEPENDENCIES: &[DependencyDescriptor] = &[];

fn reference(kind: EntityKind, id: Option<&EntityId>) -> PropertyValue {
    id.map_or(PropertyValue::Empty, |id| {
        PropertyValue::Reference(EntityHeader::new(kind, id.clone()))
    })
}

fn optional_id(property: &str, value: PropertyValue) -> Result<Option<EntityId>, ModelError> {
    match value {
        PropertyValue::Empty => Ok(None),
        PropertyValue::Reference(header) => Ok(Some(header.id().clone())),
        _ => Err(ModelError::type_mismatch(property, "a single reference")),
    }
}

fn required_id(property: &str, value: PropertyValue) -> Result<EntityId, ModelError> {
    match value {
        PropertyValue::Reference(header) => Ok(header.id().clone()),
        _ => Err(ModelError::type_mismatch(property, "a single reference")),
    }
}

impl Entity {
    /// Entity kind
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Folder(_) => EntityKind::Folder,
            Self::Policy(_) => EntityKind::Policy,
            Self::Service(_) => EntityKind::Service,
            Self::ServiceDocument(_) => EntityKind::ServiceDocument,
            Self::IdentityProvider(_) => EntityKind::IdentityProvider,
            Self::User(_) => EntityKind::User,
            Self::Group(_) => EntityKind::Group,
            Self::JdbcConnection(_) => EntityKind::JdbcConnection,
            Self::CassandraConnection(_) => EntityKind::CassandraConnection,
            Self::PrivateKey(_) => EntityKind::PrivateKey,
            Self::ClusterProperty(_) => EntityKind::ClusterProperty,
            Self::ResourceEntry(_) => EntityKind::ResourceEntry,
            Self::SecurePassword(_) => EntityKind::SecurePassword,
        }
    }

    /// Entity identity
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Self::Folder(e) => e.id.clone(),
            Self::Policy(e) => e.id.clone(),
            Self::Service(e) => e.id.clone(),
            Self::ServiceDocument(e) => e.id.clone(),
            Self::IdentityProvider(e) => e.id.clone(),
            Self::User(e) => e.id.clone(),
            Self::Group(e) => e.id.clone(),
            Self::JdbcConnection(e) => e.id.clone(),
            Self::CassandraConnection(e) => e.id.clone(),
            Self::PrivateKey(e) => e.key.entity_id(),
            Self::ClusterProperty(e) => e.id.clone(),
            Self::ResourceEntry(e) => e.id.clone(),
            Self::SecurePassword(e) => e.id.clone(),
        }
    }

    /// Replace the identity.
    ///
    /// Private keys keep their natural `keystore:alias` identity; a malformed
    /// id is ignored for them.
    pub fn set_id(&mut self, id: EntityId) {
        match self {
            Self::Folder(e) => e.id = id,
            Self::Policy(e) => e.id = id,
            Self::Service(e) => e.id = id,
            Self::ServiceDocument(e) => e.id = id,
            Self::IdentityProvider(e) => e.id = id,
            Self::User(e) => e.id = id,
            Self::Group(e) => e.id = id,
            Self::JdbcConnection(e) => e.id = id,
            Self::CassandraConnection(e) => e.id = id,
            Self::PrivateKey(e) => {
                if let Ok(key) = KeyReference::from_entity_id(&id) {
                    e.key = key;
                }
            }
            Self::ClusterProperty(e) => e.id = id,
            Self::ResourceEntry(e) => e.id = id,
            Self::SecurePassword(e) => e.id = id,
        }
    }

    /// Version
    #[must_use]
    pub fn version(&self) -> u32 {
        match self {
            Self::Folder(e) => e.version,
            Self::Policy(e) => e.version,
            Self::Service(e) => e.version,
            Self::ServiceDocument(e) => e.version,
            Self::IdentityProvider(e) => e.version,
            Self::User(e) => e.version,
            Self::Group(e) => e.version,
            Self::JdbcConnection(e) => e.version,
            Self::CassandraConnection(e) => e.version,
            Self::PrivateKey(e) => e.version,
            Self::ClusterProperty(e) => e.version,
            Self::ResourceEntry(e) => e.version,
            Self::SecurePassword(e) => e.version,
        }
    }

    /// Replace the version
    pub fn set_version(&mut self, version: u32) {
        let slot = match self {
            Self::Folder(e) => &mut e.version,
            Self::Policy(e) => &mut e.version,
            Self::Service(e) => &mut e.version,
            Self::ServiceDocument(e) => &mut e.version,
            Self::IdentityProvider(e) => &mut e.version,
            Self::User(e) => &mut e.version,
            Self::Group(e) => &mut e.version,
            Self::JdbcConnection(e) => &mut e.version,
            Self::CassandraConnection(e) => &mut e.version,
            Self::PrivateKey(e) => &mut e.version,
            Self::ClusterProperty(e) => &mut e.version,
            Self::ResourceEntry(e) => &mut e.version,
            Self::SecurePassword(e) => &mut e.version,
        };
        *slot = version;
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(e) => &e.name,
            Self::Policy(e) => &e.name,
            Self::Service(e) => &e.name,
            Self::ServiceDocument(e) => &e.uri,
            Self::IdentityProvider(e) => &e.name,
            Self::User(e) => &e.login,
            Self::Group(e) => &e.name,
            Self::JdbcConnection(e) => &e.name,
            Self::CassandraConnection(e) => &e.name,
            Self::PrivateKey(e) => &e.key.alias,
            Self::ClusterProperty(e) => &e.name,
            Self::ResourceEntry(e) => &e.uri,
            Self::SecurePassword(e) => &e.name,
        }
    }

    /// Header describing this entity.
    ///
    /// Folder paths are filled in by the store, which knows the tree.
    #[must_use]
    pub fn header(&self) -> EntityHeader {
        let header = EntityHeader::new(self.kind(), self.id())
            .with_name(self.name())
            .with_version(self.version());
        match self {
            Self::ResourceEntry(e) => header.with_extra("resourceType", e.resource_type.clone()),
            Self::IdentityProvider(e) => header.with_extra("providerType", e.provider_type.clone()),
            Self::Service(e) => match &e.routing_uri {
                Some(uri) => header.with_extra("routingUri", uri.clone()),
                None => header,
            },
            _ => header,
        }
    }

    /// Attribute used by filtered lookups
    ///
    /// Supported keys: `name`, `type`, `folder`, `parent`, `service`,
    /// `provider`, `keystore`, `uri`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<String> {
        match (self, key) {
            (_, "name") => Some(self.name().to_string()),
            (Self::ResourceEntry(e), "type") => Some(e.resource_type.clone()),
            (Self::IdentityProvider(e), "type") => Some(e.provider_type.clone()),
            (Self::ServiceDocument(e), "type") => Some(e.doc_type.clone()),
            (Self::Policy(e), "folder") => e.folder.as_ref().map(ToString::to_string),
            (Self::Service(e), "folder") => e.folder.as_ref().map(ToString::to_string),
            (Self::Folder(e), "parent" | "folder") => e.parent.as_ref().map(ToString::to_string),
            (Self::ServiceDocument(e), "service") => Some(e.service.to_string()),
            (Self::User(e), "provider") => Some(e.provider.to_string()),
            (Self::Group(e), "provider") => Some(e.provider.to_string()),
            (Self::PrivateKey(e), "keystore") => Some(e.key.keystore_id.clone()),
            (Self::ResourceEntry(e), "uri") => Some(e.uri.clone()),
            (Self::ServiceDocument(e), "uri") => Some(e.uri.clone()),
            (Self::Service(e), "uri") => e.routing_uri.clone(),
            _ => None,
        }
    }

    /// Read a value at a possibly nested path.
    ///
    /// # Errors
    /// Returns an error when the path does not lead to a declared property.
    pub fn property_at(&self, path: &PropertyPath) -> Result<PropertyValue, ModelError> {
        if let Some((ordinal, rest)) = path.nested_assertion() {
            let policy = self
                .policy()
                .ok_or_else(|| ModelError::InvalidPath(path.to_string()))?;
            let assertion = policy
                .assertion(ordinal)
                .ok_or(ModelError::AssertionNotFound(ordinal))?;
            let property = rest
                .last_property()
                .ok_or_else(|| ModelError::InvalidPath(path.to_string()))?;
            return assertion.property(property);
        }
        match (path.len(), path.first_property()) {
            (1, Some(property)) => self.property(property),
            _ => Err(ModelError::InvalidPath(path.to_string())),
        }
    }
}

impl PropertyOwner for Entity {
    fn owner_kind(&self) -> Option<EntityKind> {
        Some(self.kind())
    }

    fn owner_label(&self) -> String {
        self.header().to_string()
    }

    fn descriptors(&self) -> &'static [DependencyDescriptor] {
        match self {
            Self::Folder(_) => FOLDER_DEPENDENCIES,
            Self::Policy(_) => POLICY_DEPENDENCIES,
            Self::Service(_) => SERVICE_DEPENDENCIES,
            Self::ServiceDocument(_) => SERVICE_DOCUMENT_DEPENDENCIES,
            Self::IdentityProvider(_) => IDENTITY_PROVIDER_DEPENDENCIES,
            Self::User(_) | Self::Group(_) => MEMBER_DEPENDENCIES,
            Self::JdbcConnection(_) => JDBC_DEPENDENCIES,
            Self::CassandraConnection(_) => CASSANDRA_DEPENDENCIES,
            Self::ResourceEntry(_) => RESOURCE_DEPENDENCIES,
            Self::PrivateKey(_) | Self::ClusterProperty(_) | Self::SecurePassword(_) => NO_DEPENDENCIES,
        }
    }

    fn property(&self, name: &str) -> Result<PropertyValue, ModelError> {
        let value = match (self, name) {
            (Self::Folder(e), "parent") => reference(EntityKind::Folder, e.parent.as_ref()),
            (Self::Policy(e), "folder") => reference(EntityKind::Folder, e.folder.as_ref()),
            (Self::Service(e), "folder") => reference(EntityKind::Folder, e.folder.as_ref()),
            // Assertion trees and attached documents are walked by their resolvers.
            (Self::Policy(_), "assertions") | (Self::Service(_), "policy" | "documents") => {
                PropertyValue::Empty
            }
            (Self::ServiceDocument(e), "service") => reference(EntityKind::Service, Some(&e.service)),
            (Self::IdentityProvider(e), "bind_password") => {
                reference(EntityKind::SecurePassword, e.bind_password.as_ref())
            }
            (Self::User(e), "provider") => reference(EntityKind::IdentityProvider, Some(&e.provider)),
            (Self::Group(e), "provider") => reference(EntityKind::IdentityProvider, Some(&e.provider)),
            (Self::JdbcConnection(e), "url") => PropertyValue::Text(e.jdbc_url.clone()),
            (Self::JdbcConnection(e), "password") => {
                reference(EntityKind::SecurePassword, e.password.as_ref())
            }
            (Self::CassandraConnection(e), "password") => {
                reference(EntityKind::SecurePassword, e.password.as_ref())
            }
            (Self::ResourceEntry(e), "imports") => PropertyValue::References(
                e.imports
                    .iter()
                    .map(|id| EntityHeader::new(EntityKind::ResourceEntry, id.clone()))
                    .collect(),
            ),
            _ => return Err(ModelError::unknown_property(self.owner_label(), name)),
        };
        Ok(value)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ModelError> {
        match (self, name) {
            (Self::Folder(e), "parent") => e.parent = optional_id(name, value)?,
            (Self::Policy(e), "folder") => e.folder = optional_id(name, value)?,
            (Self::Service(e), "folder") => e.folder = optional_id(name, value)?,
            (Self::ServiceDocument(e), "service") => e.service = required_id(name, value)?,
            (Self::IdentityProvider(e), "bind_password") => e.bind_password = optional_id(name, value)?,
            (Self::User(e), "provider") => e.provider = required_id(name, value)?,
            (Self::Group(e), "provider") => e.provider = required_id(name, value)?,
            (Self::JdbcConnection(e), "url") => match value {
                PropertyValue::Text(url) => e.jdbc_url = url,
                _ => return Err(ModelError::type_mismatch(name, "text")),
            },
            (Self::JdbcConnection(e), "password") => e.password = optional_id(name, value)?,
            (Self::CassandraConnection(e), "password") => e.password = optional_id(name, value)?,
            (Self::ResourceEntry(e), "imports") => match value {
                PropertyValue::References(headers) => {
                    e.imports = headers.iter().map(|h| h.id().clone()).collect();
                }
                PropertyValue::Reference(header) => e.imports = vec![header.id().clone()],
                PropertyValue::Empty => e.imports.clear(),
                _ => return Err(ModelError::type_mismatch(name, "references")),
            },
            (entity, _) => return Err(ModelError::unknown_property(entity.owner_label(), name)),
        }
        Ok(())
    }

    fn policy(&self) -> Option<&Policy> {
        match self {
            Self::Policy(policy) => Some(policy),
            Self::Service(service) => Some(&service.policy),
            _ => None,
        }
    }

    fn policy_mut(&mut self) -> Option<&mut Policy> {
        match self {
            Self::Policy(policy) => Some(policy),
            Self::Service(service) => Some(&mut service.policy),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Assertion;
    use pretty_assertions::assert_eq;

    fn connection() -> Entity {
        Entity::JdbcConnection(JdbcConnection {
            id: EntityId::new("c1"),
            version: 2,
            name: "orders".into(),
            driver_class: "org.mariadb.jdbc.Driver".into(),
            jdbc_url: "jdbc:mysql://source/orders".into(),
            user_name: "app".into(),
            password: Some(EntityId::new("pw1")),
        })
    }

    #[test]
    fn header_carries_kind_name_and_version() {
        let header = connection().header();
        assert_eq!(header.kind(), EntityKind::JdbcConnection);
        assert_eq!(header.name(), Some("orders"));
        assert_eq!(header.version(), 2);
    }

    #[test]
    fn resource_header_carries_type_attribute() {
        let entity = Entity::ResourceEntry(ResourceEntry {
            id: EntityId::new("r1"),
            version: 0,
            uri: "urn:schema".into(),
            resource_type: "XML_SCHEMA".into(),
            content: String::new(),
            imports: Vec::new(),
        });
        assert_eq!(entity.header().extra_property("resourceType"), Some("XML_SCHEMA"));
        assert_eq!(entity.attribute("type").as_deref(), Some("XML_SCHEMA"));
    }

    #[test]
    fn private_key_identity_is_natural() {
        let mut entity = Entity::PrivateKey(PrivateKey {
            key: KeyReference::new("ks", "signer"),
            version: 0,
            subject_dn: "CN=signer".into(),
        });
        assert_eq!(entity.id().as_str(), "ks:signer");
        entity.set_id(EntityId::new("garbage"));
        assert_eq!(entity.id().as_str(), "ks:signer");
    }

    #[test]
    fn set_reference_property() {
        let mut entity = connection();
        entity
            .set_property(
                "password",
                PropertyValue::Reference(EntityHeader::new(EntityKind::SecurePassword, "pw2")),
            )
            .unwrap();
        assert_eq!(
            entity.property("password").unwrap().headers(),
            vec![EntityHeader::new(EntityKind::SecurePassword, "pw2")]
        );
    }

    #[test]
    fn unknown_property_is_rejected() {
        let entity = connection();
        assert!(matches!(
            entity.property("folder"),
            Err(ModelError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn property_at_reaches_nested_assertion() {
        let mut policy = Policy::new(
            "routing",
            Assertion::All {
                children: vec![Assertion::HttpRouting {
                    url: "http://backend".into(),
                }],
            },
        );
        policy.id = EntityId::new("p1");
        let entity = Entity::Policy(policy);
        let path: PropertyPath = "assertions/#2/url".parse().unwrap();
        assert_eq!(
            entity.property_at(&path).unwrap(),
            PropertyValue::Text("http://backend".into())
        );
        let missing: PropertyPath = "assertions/#9/url".parse().unwrap();
        assert_eq!(entity.property_at(&missing), Err(ModelError::AssertionNotFound(9)));
    }

    #[test]
    fn entity_json_is_tagged_by_kind() {
        let json = serde_json::to_value(connection()).unwrap();
        assert_eq!(json["kind"], "JDBC_CONNECTION");
        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, connection());
    }
}
