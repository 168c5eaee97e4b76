//! GME Graph
//!
//! Dependency graph, mappings and bundles exchanged between clusters.
//!
//! # Core Concepts
//!
//! - [`MigrationDependency`]: Edge from a dependant to the entity it references
//! - [`MigrationMetadata`]: Nodes, edges, roots and operator-assigned mappings
//! - [`MigrationBundle`]: Metadata plus exported payloads, versioned and fingerprinted
//! - [`MigratedItem`]: Per-header import outcome
//!
//! # Example
//!
//! ```rust,ignore
//! use gme_graph::{MappingKind, MigrationBundle};
//!
//! let mut bundle = MigrationBundle::from_json(&json)?;
//! bundle
//!     .metadata_mut()
//!     .add_mapping(source_connection, target_connection, MappingKind::Mapped);
//! ```

#![warn(unreachable_pub)]

mod bundle;
mod dependency;
mod error;
mod item;
mod metadata;

pub use bundle::{ExportedItem, MigrationBundle, BUNDLE_FORMAT_VERSION};
pub use dependency::MigrationDependency;
pub use error::GraphError;
pub use item::{ImportOperation, MigratedItem};
pub use metadata::{MappingKind, MappingTarget, MigrationMetadata};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
