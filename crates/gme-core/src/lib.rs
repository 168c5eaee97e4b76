//! GME Core
//!
//! Moves gateway configuration between clusters.
//!
//! # Core Concepts
//!
//! - [`MigrationManager`]: Discovery, export, mapping candidates and import over one cluster
//! - [`ImportPlan`]: A bundle validated against the target, applied in dependency order
//! - [`ServiceResolutionChecker`]: Guards against services that would capture each other's traffic
//! - [`MigrationConfig`] / [`ImportOptions`]: Engine settings and per-import choices
//!
//! # Example
//!
//! ```rust,ignore
//! use gme_core::{ImportOptions, MigrationManager};
//!
//! let bundle = source.export_bundle(&[policy_header])?;
//! let plan = target.plan_import(&bundle, &ImportOptions::new().with_dry_run(true))?;
//! for finding in plan.findings() {
//!     println!("{finding}");
//! }
//! let items = plan.apply()?;
//! ```

#![warn(unreachable_pub)]

mod checker;
mod config;
mod error;
mod manager;

pub use checker::{NoConflictChecker, RoutingUriChecker, ServiceConflict, ServiceResolutionChecker};
pub use config::{ImportOptions, MigrationConfig};
pub use error::MigrationError;
pub use manager::{decide_operation, locate_root_folder, ImportPlan, MigrationManager, ValidationFinding};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
