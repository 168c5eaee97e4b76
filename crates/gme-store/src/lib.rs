//! GME Store
//!
//! Cluster access for the migration engine.
//!
//! - [`EntityStore`]: lookup, filtered search, save/update and units of work
//! - [`EntityFilter`]: attribute and folder filters for candidate searches
//! - [`InMemoryEntityStore`]: thread-safe store with JSON persistence

#![warn(unreachable_pub)]

mod error;
mod memory;
mod store;

pub use error::StoreError;
pub use memory::InMemoryEntityStore;
pub use store::{EntityFilter, EntityStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
