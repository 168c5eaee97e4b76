//! Dependency descriptors
//!
//! Every entity and assertion type declares which of its properties refer to
//! other entities. A descriptor names the property, the resolver that knows how
//! to read and rewrite it, and the mapping flags copied onto discovered edges.

use serde::{Deserialize, Serialize};

use crate::header::MappingSelection;
use crate::kind::EntityKind;

/// Strategy responsible for a dependency-bearing property
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    /// Direct entity references
    Default,
    /// Assertion tree of a policy or service
    Policy,
    /// JDBC connection referenced by name
    JdbcConnection,
    /// Cassandra connection referenced by name
    CassandraConnection,
    /// Private key referenced by keystore and alias
    PrivateKey,
    /// Cluster properties referenced from `${gateway.*}` expressions
    ServerVariable,
    /// Literal values that may need a replacement
    ValueReference,
    /// Users and groups inside an identity provider
    UserGroup,
    /// Documents attached to a service
    ServiceDocument,
}

impl ResolverKind {
    /// All kinds, in declaration order
    pub const ALL: [ResolverKind; 9] = [
        ResolverKind::Default,
        ResolverKind::Policy,
        ResolverKind::JdbcConnection,
        ResolverKind::CassandraConnection,
        ResolverKind::PrivateKey,
        ResolverKind::ServerVariable,
        ResolverKind::ValueReference,
        ResolverKind::UserGroup,
        ResolverKind::ServiceDocument,
    ];
}

/// Declaration of one dependency-bearing property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyDescriptor {
    /// Property name
    pub property: &'static str,
    /// Resolver for the property
    pub resolver: ResolverKind,
    /// Kind of the referenced entity, when fixed
    pub target: Option<EntityKind>,
    /// Whether the dependency may or must be mapped by name
    pub name_mapping: MappingSelection,
    /// Whether the value may or must be replaced
    pub value_mapping: MappingSelection,
    /// Whether the dependency travels in an exported bundle
    pub exported: bool,
}

impl DependencyDescriptor {
    /// Create new descriptor with no mapping and export enabled
    #[must_use]
    pub const fn new(property: &'static str, resolver: ResolverKind) -> Self {
        Self {
            property,
            resolver,
            target: None,
            name_mapping: MappingSelection::Optional,
            value_mapping: MappingSelection::None,
            exported: true,
        }
    }

    /// Set referenced entity kind
    #[must_use]
    pub const fn target(self, kind: EntityKind) -> Self {
        Self {
            target: Some(kind),
            ..self
        }
    }

    /// Set name-mapping selection
    #[must_use]
    pub const fn name_mapping(self, selection: MappingSelection) -> Self {
        Self {
            name_mapping: selection,
            ..self
        }
    }

    /// Set value-mapping selection
    #[must_use]
    pub const fn value_mapping(self, selection: MappingSelection) -> Self {
        Self {
            value_mapping: selection,
            ..self
        }
    }

    /// Keep the referenced entity out of exported bundles
    #[must_use]
    pub const fn not_exported(self) -> Self {
        Self {
            exported: false,
            ..self
        }
    }
}

/// Find a descriptor by property name
#[must_use]
pub fn find_descriptor<'a>(
    descriptors: &'a [DependencyDescriptor],
    property: &str,
) -> Option<&'a DependencyDescriptor> {
    descriptors.iter().find(|d| d.property == property)
}
