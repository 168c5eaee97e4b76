//! GME Model
//!
//! Gateway configuration entities and the references used to move them
//! between clusters.
//!
//! # Core Concepts
//!
//! - [`EntityHeader`]: Comparable reference to an entity (kind + id)
//! - [`Entity`]: Full configuration object behind a header
//! - [`PropertyOwner`]: Dependency-bearing properties of an entity or assertion
//! - [`DependencyDescriptor`]: Declares which properties refer to other entities
//! - [`PropertyPath`]: Location of a value inside its owner, e.g. `assertions/#3/connection`
//!
//! # Example
//!
//! ```rust,ignore
//! use gme_model::{Entity, PropertyOwner};
//!
//! for descriptor in entity.descriptors() {
//!     let value = entity.property(descriptor.property)?;
//!     println!("{} -> {:?}", descriptor.property, value.headers());
//! }
//! ```

#![warn(unreachable_pub)]

mod descriptor;
mod entity;
mod error;
mod header;
mod kind;
mod path;
mod policy;
mod value;

pub use descriptor::{find_descriptor, DependencyDescriptor, ResolverKind};
pub use entity::{
    CassandraConnection, ClusterProperty, Entity, Folder, Group, IdentityProvider, JdbcConnection,
    PrivateKey, ResourceEntry, SecurePassword, Service, ServiceDocument, User,
};
pub use error::ModelError;
pub use header::{EntityHeader, MappingSelection, ValueMapping, ValueReference};
pub use kind::{EntityId, EntityKind};
pub use path::{PathSegment, PropertyPath};
pub use policy::{Assertion, KeyReference, Policy, PolicyType};
pub use value::{PropertyOwner, PropertyValue};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
