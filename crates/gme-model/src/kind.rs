//! Entity kinds and identities

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;

/// Kind of configuration entity managed by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    /// Folder in the organisational tree
    Folder,
    /// Reusable or global policy
    Policy,
    /// Published service with its embedded policy
    Service,
    /// WSDL or schema document attached to a service
    ServiceDocument,
    /// Identity provider (internal, LDAP, federated)
    IdentityProvider,
    /// User inside an identity provider
    User,
    /// Group inside an identity provider
    Group,
    /// JDBC connection
    JdbcConnection,
    /// Cassandra connection
    CassandraConnection,
    /// Private key held in a keystore
    PrivateKey,
    /// Cluster-wide property
    ClusterProperty,
    /// Schema, DTD or other global resource
    ResourceEntry,
    /// Stored secure password
    SecurePassword,
    /// Synthetic kind for a literal value embedded inside another entity
    ValueReference,
}

impl EntityKind {
    /// All kinds, in declaration order
    pub const ALL: [EntityKind; 14] = [
        EntityKind::Folder,
        EntityKind::Policy,
        EntityKind::Service,
        EntityKind::ServiceDocument,
        EntityKind::IdentityProvider,
        EntityKind::User,
        EntityKind::Group,
        EntityKind::JdbcConnection,
        EntityKind::CassandraConnection,
        EntityKind::PrivateKey,
        EntityKind::ClusterProperty,
        EntityKind::ResourceEntry,
        EntityKind::SecurePassword,
        EntityKind::ValueReference,
    ];

    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "FOLDER",
            Self::Policy => "POLICY",
            Self::Service => "SERVICE",
            Self::ServiceDocument => "SERVICE_DOCUMENT",
            Self::IdentityProvider => "IDENTITY_PROVIDER",
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::JdbcConnection => "JDBC_CONNECTION",
            Self::CassandraConnection => "CASSANDRA_CONNECTION",
            Self::PrivateKey => "PRIVATE_KEY",
            Self::ClusterProperty => "CLUSTER_PROPERTY",
            Self::ResourceEntry => "RESOURCE_ENTRY",
            Self::SecurePassword => "SECURE_PASSWORD",
            Self::ValueReference => "VALUE_REFERENCE",
        }
    }

    /// Whether the store assigns a fresh identity when an entity of this kind is saved.
    ///
    /// Private keys are addressed by keystore and alias, value references by
    /// their owner, so both keep their identity across clusters.
    #[inline]
    #[must_use]
    pub fn has_generated_identity(&self) -> bool {
        !matches!(self, Self::PrivateKey | Self::ValueReference)
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}

/// Opaque identity of an entity within one cluster
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create id from an existing value
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random identity
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the raw identity
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the identity is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_accepts_lowercase_and_dashes() {
        assert_eq!("jdbc-connection".parse::<EntityKind>().unwrap(), EntityKind::JdbcConnection);
        assert_eq!("FOLDER".parse::<EntityKind>().unwrap(), EntityKind::Folder);
        assert!("widget".parse::<EntityKind>().is_err());
    }

    #[test]
    fn kind_display_matches_wire_name() {
        for kind in EntityKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn natural_identity_kinds() {
        assert!(!EntityKind::PrivateKey.has_generated_identity());
        assert!(!EntityKind::ValueReference.has_generated_identity());
        assert!(EntityKind::Policy.has_generated_identity());
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }
}
