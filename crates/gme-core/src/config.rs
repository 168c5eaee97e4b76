//! Migration configuration
//!
//! [`MigrationConfig`] holds engine-wide settings and is usually loaded from a
//! TOML file. [`ImportOptions`] are chosen per import.

use serde::{Deserialize, Serialize};

use gme_model::EntityHeader;

use crate::error::MigrationError;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Reject imports with validation findings instead of logging them
    pub strict_validation: bool,
    /// Maximum candidates returned per header
    pub candidate_limit: usize,
    /// Walk into dependencies that must be mapped onto the target anyway
    pub follow_required_mappings: bool,
}

impl MigrationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With strict validation
    #[inline]
    #[must_use]
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// With candidate limit
    #[inline]
    #[must_use]
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }

    /// With discovery past required mappings
    #[inline]
    #[must_use]
    pub fn with_follow_required_mappings(mut self, follow: bool) -> Self {
        self.follow_required_mappings = follow;
        self
    }

    /// Parse configuration from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns [`MigrationError::Config`] for malformed input.
    pub fn from_toml_str(input: &str) -> Result<Self, MigrationError> {
        toml::from_str(input).map_err(|e| MigrationError::Config(e.to_string()))
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            strict_validation: false,
            candidate_limit: 50,
            follow_required_mappings: false,
        }
    }
}

/// Per-import choices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Folder receiving the import, the cluster root folder when unset
    pub target_folder: Option<EntityHeader>,
    /// Put every imported entity directly into the target folder
    pub flatten_folders: bool,
    /// Overwrite target entities that copied headers point at
    pub overwrite_existing: bool,
    /// Keep imported services enabled
    pub enable_services: bool,
    /// Decide and report everything without writing to the target
    pub dry_run: bool,
}

impl ImportOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With target folder
    #[inline]
    #[must_use]
    pub fn with_target_folder(mut self, folder: EntityHeader) -> Self {
        self.target_folder = Some(folder);
        self
    }

    /// With folder flattening
    #[inline]
    #[must_use]
    pub fn with_flatten_folders(mut self, flatten: bool) -> Self {
        self.flatten_folders = flatten;
        self
    }

    /// With overwriting of copied targets
    #[inline]
    #[must_use]
    pub fn with_overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    /// With enabled services
    #[inline]
    #[must_use]
    pub fn with_enable_services(mut self, enable: bool) -> Self {
        self.enable_services = enable;
        self
    }

    /// As dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}
