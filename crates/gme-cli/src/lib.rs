//! GME command line support
//!
//! Commands work on JSON snapshots of a cluster written by
//! [`gme_store::InMemoryEntityStore::persist`], so a migration can be
//! rehearsed offline between two snapshot files.
//!
//! # Example
//!
//! ```text
//! gme export --store dev.json --out bundle.json POLICY:p1
//! gme import --store prod.json --bundle bundle.json --map USER:alice=u-17 --dry-run
//! ```

#![warn(unreachable_pub)]

pub mod commands;

pub use commands::{load_config, parse_header, parse_mapping, parse_value, ImportRequest, Workspace};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
