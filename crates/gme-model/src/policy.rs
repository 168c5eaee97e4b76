//! Policies and their assertion trees
//!
//! A policy body is a tree of [`Assertion`]s. Assertions are addressed by
//! their pre-order position in the tree, starting at 1 for the root, which is
//! how property paths reach values nested inside a policy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{DependencyDescriptor, ResolverKind};
use crate::error::ModelError;
use crate::header::{EntityHeader, MappingSelection};
use crate::kind::{EntityId, EntityKind};
use crate::value::{PropertyOwner, PropertyValue};

/// Keystore and alias of a private key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyReference {
    /// Keystore holding the key
    pub keystore_id: String,
    /// Alias inside the keystore
    pub alias: String,
}

impl KeyReference {
    /// Create new key reference
    #[must_use]
    pub fn new(keystore_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            keystore_id: keystore_id.into(),
            alias: alias.into(),
        }
    }

    /// Identity of the referenced private key entity
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        EntityId::new(format!("{}:{}", self.keystore_id, self.alias))
    }

    /// Parse a `keystore:alias` identity
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidKeyReference`] when either part is missing.
    pub fn from_entity_id(id: &EntityId) -> Result<Self, ModelError> {
        match id.as_str().split_once(':') {
            Some((keystore, alias)) if !keystore.is_empty() && !alias.is_empty() => {
                Ok(Self::new(keystore, alias))
            }
            _ => Err(ModelError::InvalidKeyReference(id.to_string())),
        }
    }
}

/// Node of a policy's assertion tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// All children must succeed
    All {
        /// Child assertions
        #[serde(default)]
        children: Vec<Assertion>,
    },
    /// At least one child must succeed
    OneOrMore {
        /// Child assertions
        #[serde(default)]
        children: Vec<Assertion>,
    },
    /// Run a reusable policy fragment
    Include {
        /// Included policy
        policy: EntityId,
    },
    /// Query a database through a named JDBC connection
    JdbcQuery {
        /// Connection name or `${...}` expression
        connection: String,
        /// SQL text
        sql: String,
    },
    /// Query through a named Cassandra connection
    CassandraQuery {
        /// Connection name or `${...}` expression
        connection: String,
        /// CQL text
        query: String,
    },
    /// Sign the response with a private key, the default key when unset
    SignResponse {
        /// Key to sign with
        #[serde(default)]
        key: Option<KeyReference>,
    },
    /// Authenticate against an identity provider
    Authenticate {
        /// Identity provider
        provider: EntityId,
    },
    /// Require a specific user
    SpecificUser {
        /// Identity provider holding the user
        provider: EntityId,
        /// User identity
        user: EntityId,
        /// Login shown to administrators
        login: String,
    },
    /// Require membership of a group
    MemberOfGroup {
        /// Identity provider holding the group
        provider: EntityId,
        /// Group identity
        group: EntityId,
        /// Group name
        name: String,
    },
    /// Route the request to a backend URL
    HttpRouting {
        /// Backend URL
        url: String,
    },
    /// Assign a context variable
    SetVariable {
        /// Variable name
        variable: String,
        /// Expression, may reference `${gateway.*}` cluster properties
        expression: String,
    },
    /// Validate against a global schema
    ValidateSchema {
        /// Schema resource
        #[serde(default)]
        resource: Option<EntityId>,
    },
    /// Free-text comment
    Comment {
        /// Comment text
        text: String,
    },
}

static NO_DEPENDENCIES: &[DependencyDescriptor] = &[];

static INCLUDE_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("policy", ResolverKind::Default).target(EntityKind::Policy)];

static JDBC_QUERY_DEPENDENCIES: &[DependencyDescriptor] = &[DependencyDescriptor::new(
    "connection",
    ResolverKind::JdbcConnection,
)
.target(EntityKind::JdbcConnection)];

static CASSANDRA_QUERY_DEPENDENCIES: &[DependencyDescriptor] = &[DependencyDescriptor::new(
    "connection",
    ResolverKind::CassandraConnection,
)
.target(EntityKind::CassandraConnection)];

static SIGN_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("key", ResolverKind::PrivateKey)
        .target(EntityKind::PrivateKey)
        .not_exported()];

static AUTHENTICATE_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("provider", ResolverKind::Default)
        .target(EntityKind::IdentityProvider)
        .not_exported()];

static IDENTITY_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("identity", ResolverKind::UserGroup).not_exported()];

static ROUTING_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("url", ResolverKind::ValueReference)
        .name_mapping(MappingSelection::None)
        .value_mapping(MappingSelection::Optional)];

static VARIABLE_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("expression", ResolverKind::ServerVariable)
        .target(EntityKind::ClusterProperty)];

static SCHEMA_DEPENDENCIES: &[DependencyDescriptor] =
    &[DependencyDescriptor::new("resource", ResolverKind::Default).target(EntityKind::ResourceEntry)];

impl Assertion {
    /// Short type name
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::All { .. } => "all",
            Self::OneOrMore { .. } => "one_or_more",
            Self::Include { .. } => "include",
            Self::JdbcQuery { .. } => "jdbc_query",
            Self::CassandraQuery { .. } => "cassandra_query",
            Self::SignResponse { .. } => "sign_response",
            Self::Authenticate { .. } => "authenticate",
            Self::SpecificUser { .. } => "specific_user",
            Self::MemberOfGroup { .. } => "member_of_group",
            Self::HttpRouting { .. } => "http_routing",
            Self::SetVariable { .. } => "set_variable",
            Self::ValidateSchema { .. } => "validate_schema",
            Self::Comment { .. } => "comment",
        }
    }

    /// Child assertions of a composite
    #[must_use]
    pub fn children(&self) -> &[Assertion] {
        match self {
            Self::All { children } | Self::OneOrMore { children } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Assertion>> {
        match self {
            Self::All { children } | Self::OneOrMore { children } => Some(children),
            _ => None,
        }
    }

    fn text_slot(&mut self, name: &str) -> Option<&mut String> {
        match (self, name) {
            (Self::JdbcQuery { connection, .. }, "connection")
            | (Self::CassandraQuery { connection, .. }, "connection") => Some(connection),
            (Self::HttpRouting { url }, "url") => Some(url),
            (Self::SetVariable { expression, .. }, "expression") => Some(expression),
            _ => None,
        }
    }
}

impl PropertyOwner for Assertion {
    fn owner_kind(&self) -> Option<EntityKind> {
        None
    }

    fn owner_label(&self) -> String {
        format!("assertion '{}'", self.type_name())
    }

    fn descriptors(&self) -> &'static [DependencyDescriptor] {
        match self {
            Self::Include { .. } => INCLUDE_DEPENDENCIES,
            Self::JdbcQuery { .. } => JDBC_QUERY_DEPENDENCIES,
            Self::CassandraQuery { .. } => CASSANDRA_QUERY_DEPENDENCIES,
            Self::SignResponse { .. } => SIGN_DEPENDENCIES,
            Self::Authenticate { .. } => AUTHENTICATE_DEPENDENCIES,
            Self::SpecificUser { .. } | Self::MemberOfGroup { .. } => IDENTITY_DEPENDENCIES,
            Self::HttpRouting { .. } => ROUTING_DEPENDENCIES,
            Self::SetVariable { .. } => VARIABLE_DEPENDENCIES,
            Self::ValidateSchema { .. } => SCHEMA_DEPENDENCIES,
            Self::All { .. } | Self::OneOrMore { .. } | Self::Comment { .. } => NO_DEPENDENCIES,
        }
    }

    fn property(&self, name: &str) -> Result<PropertyValue, ModelError> {
        let value = match (self, name) {
            (Self::Include { policy }, "policy") => {
                PropertyValue::Reference(EntityHeader::new(EntityKind::Policy, policy.clone()))
            }
            (Self::JdbcQuery { connection, .. }, "connection")
            | (Self::CassandraQuery { connection, .. }, "connection") => {
                PropertyValue::Text(connection.clone())
            }
            (Self::SignResponse { key }, "key") => {
                key.clone().map_or(PropertyValue::Empty, PropertyValue::Key)
            }
            (Self::Authenticate { provider }, "provider") => PropertyValue::Reference(
                EntityHeader::new(EntityKind::IdentityProvider, provider.clone()),
            ),
            (Self::SpecificUser { provider, user, login }, "identity") => PropertyValue::References(vec![
                EntityHeader::new(EntityKind::IdentityProvider, provider.clone()),
                EntityHeader::new(EntityKind::User, user.clone()).with_name(login.clone()),
            ]),
            (Self::MemberOfGroup { provider, group, name }, "identity") => {
                PropertyValue::References(vec![
                    EntityHeader::new(EntityKind::IdentityProvider, provider.clone()),
                    EntityHeader::new(EntityKind::Group, group.clone()).with_name(name.clone()),
                ])
            }
            (Self::HttpRouting { url }, "url") => PropertyValue::Text(url.clone()),
            (Self::SetVariable { expression, .. }, "expression") => {
                PropertyValue::Text(expression.clone())
            }
            (Self::ValidateSchema { resource }, "resource") => {
                resource.clone().map_or(PropertyValue::Empty, |id| {
                    PropertyValue::Reference(EntityHeader::new(EntityKind::ResourceEntry, id))
                })
            }
            _ => return Err(ModelError::unknown_property(self.owner_label(), name)),
        };
        Ok(value)
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), ModelError> {
        let label = self.owner_label();
        if let Some(slot) = self.text_slot(name) {
            return match value {
                PropertyValue::Text(text) => {
                    *slot = text;
                    Ok(())
                }
                _ => Err(ModelError::type_mismatch(name, "text")),
            };
        }
        match (self, name, value) {
            (Self::Include { policy }, "policy", PropertyValue::Reference(header)) => {
                *policy = header.id().clone();
            }
            (Self::SignResponse { key }, "key", PropertyValue::Key(reference)) => {
                *key = Some(reference);
            }
            (Self::SignResponse { key }, "key", PropertyValue::Empty) => *key = None,
            (Self::Authenticate { provider }, "provider", PropertyValue::Reference(header)) => {
                *provider = header.id().clone();
            }
            (Self::SpecificUser { provider, user, login }, "identity", PropertyValue::References(headers)) => {
                for header in headers {
                    match header.kind() {
                        EntityKind::IdentityProvider => *provider = header.id().clone(),
                        EntityKind::User => {
                            *user = header.id().clone();
                            if let Some(name) = header.name() {
                                *login = name.to_string();
                            }
                        }
                        _ => return Err(ModelError::type_mismatch(name, "identity provider or user")),
                    }
                }
            }
            (Self::MemberOfGroup { provider, group, name: group_name }, "identity", PropertyValue::References(headers)) => {
                for header in headers {
                    match header.kind() {
                        EntityKind::IdentityProvider => *provider = header.id().clone(),
                        EntityKind::Group => {
                            *group = header.id().clone();
                            if let Some(n) = header.name() {
                                *group_name = n.to_string();
                            }
                        }
                        _ => return Err(ModelError::type_mismatch(name, "identity provider or group")),
                    }
                }
            }
            (Self::ValidateSchema { resource }, "resource", PropertyValue::Reference(header)) => {
                *resource = Some(header.id().clone());
            }
            (Self::ValidateSchema { resource }, "resource", PropertyValue::Empty) => *resource = None,
            (assertion, property, _) => {
                return if assertion.descriptors().iter().any(|d| d.property == property) {
                    Err(ModelError::type_mismatch(property, "a reference of the declared kind"))
                } else {
                    Err(ModelError::unknown_property(label, property))
                };
            }
        }
        Ok(())
    }
}

/// Kind of policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Fragment reusable through `include`
    #[default]
    Include,
    /// Policy embedded in a service
    Service,
    /// Global policy run for every request
    Global,
}

/// Policy with its assertion tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy identity (guid)
    pub id: EntityId,
    /// Version
    #[serde(default)]
    pub version: u32,
    /// Name
    pub name: String,
    /// Containing folder
    #[serde(default)]
    pub folder: Option<EntityId>,
    /// Kind of policy
    #[serde(default)]
    pub policy_type: PolicyType,
    /// Root assertion
    pub root: Assertion,
}

impl Policy {
    /// Create new policy with a generated identity
    #[must_use]
    pub fn new(name: impl Into<String>, root: Assertion) -> Self {
        Self {
            id: EntityId::generate(),
            version: 0,
            name: name.into(),
            folder: None,
            policy_type: PolicyType::Include,
            root,
        }
    }

    /// Assertions in pre-order, paired with their ordinal starting at 1
    #[must_use]
    pub fn assertions(&self) -> Vec<(u32, &Assertion)> {
        fn visit<'a>(node: &'a Assertion, out: &mut Vec<(u32, &'a Assertion)>) {
            let ordinal = u32::try_from(out.len() + 1).unwrap_or(u32::MAX);
            out.push((ordinal, node));
            for child in node.children() {
                visit(child, out);
            }
        }

        let mut out = Vec::new();
        visit(&self.root, &mut out);
        out
    }

    /// Assertion at a pre-order ordinal
    #[must_use]
    pub fn assertion(&self, ordinal: u32) -> Option<&Assertion> {
        self.assertions()
            .into_iter()
            .find(|(n, _)| *n == ordinal)
            .map(|(_, a)| a)
    }

    /// Mutable assertion at a pre-order ordinal
    pub fn assertion_mut(&mut self, ordinal: u32) -> Option<&mut Assertion> {
        fn find<'a>(node: &'a mut Assertion, target: u32, next: &mut u32) -> Option<&'a mut Assertion> {
            let current = *next;
            *next += 1;
            if current == target {
                return Some(node);
            }
            if let Some(children) = node.children_mut() {
                for child in children.iter_mut() {
                    if let Some(found) = find(child, target, next) {
                        return Some(found);
                    }
                }
            }
            None
        }

        let mut next = 1;
        find(&mut self.root, ordinal, &mut next)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_policy() -> Policy {
        Policy::new(
            "sample",
            Assertion::All {
                children: vec![
                    Assertion::Comment { text: "start".into() },
                    Assertion::OneOrMore {
                        children: vec![Assertion::JdbcQuery {
                            connection: "orders".into(),
                            sql: "select 1".into(),
                        }],
                    },
                    Assertion::HttpRouting {
                        url: "http://backend".into(),
                    },
                ],
            },
        )
    }

    #[test]
    fn assertions_are_numbered_in_preorder() {
        let policy = sample_policy();
        let names: Vec<(u32, &str)> = policy
            .assertions()
            .into_iter()
            .map(|(n, a)| (n, a.type_name()))
            .collect();
        assert_eq!(
            names,
            vec![
                (1, "all"),
                (2, "comment"),
                (3, "one_or_more"),
                (4, "jdbc_query"),
                (5, "http_routing"),
            ]
        );
    }

    #[test]
    fn assertion_mut_finds_nested_node() {
        let mut policy = sample_policy();
        let assertion = policy.assertion_mut(4).unwrap();
        assertion
            .set_property("connection", PropertyValue::Text("billing".into()))
            .unwrap();
        assert_eq!(
            policy.assertion(4).unwrap().property("connection").unwrap(),
            PropertyValue::Text("billing".into())
        );
        assert!(policy.assertion_mut(6).is_none());
    }

    #[test]
    fn identity_property_reports_provider_and_user() {
        let assertion = Assertion::SpecificUser {
            provider: EntityId::new("idp"),
            user: EntityId::new("u1"),
            login: "alice".into(),
        };
        let headers = assertion.property("identity").unwrap().headers();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].kind(), EntityKind::IdentityProvider);
        assert_eq!(headers[1].name(), Some("alice"));
    }

    #[test]
    fn set_identity_rewrites_user_and_login() {
        let mut assertion = Assertion::SpecificUser {
            provider: EntityId::new("idp"),
            user: EntityId::new("u1"),
            login: "alice".into(),
        };
        assertion
            .set_property(
                "identity",
                PropertyValue::References(vec![
                    EntityHeader::new(EntityKind::IdentityProvider, "idp2"),
                    EntityHeader::new(EntityKind::User, "u9").with_name("bob"),
                ]),
            )
            .unwrap();
        assert_eq!(
            assertion,
            Assertion::SpecificUser {
                provider: EntityId::new("idp2"),
                user: EntityId::new("u9"),
                login: "bob".into(),
            }
        );
    }

    #[test]
    fn set_property_rejects_wrong_shape() {
        let mut assertion = Assertion::HttpRouting { url: "x".into() };
        assert!(matches!(
            assertion.set_property("url", PropertyValue::Empty),
            Err(ModelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            assertion.set_property("nope", PropertyValue::Empty),
            Err(ModelError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn key_reference_identity() {
        let key = KeyReference::new("ks1", "signer");
        assert_eq!(key.entity_id().as_str(), "ks1:signer");
        assert_eq!(KeyReference::from_entity_id(&key.entity_id()).unwrap(), key);
        assert!(KeyReference::from_entity_id(&EntityId::new("broken")).is_err());
    }
}
