//! Import results

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use gme_model::EntityHeader;

/// What an import did with one header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportOperation {
    /// New entity written to the target
    Create,
    /// Existing target entity overwritten
    Update,
    /// Existing target entity used as-is
    Ignore,
}

impl ImportOperation {
    /// Check if the operation writes to the target
    #[inline]
    #[must_use]
    pub fn modifies_target(&self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

impl Display for ImportOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Ignore => "IGNORE",
        })
    }
}

/// Outcome for one imported header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigratedItem {
    /// Header from the bundle
    pub header: EntityHeader,
    /// Header of the resulting target entity
    pub result_header: EntityHeader,
    /// Operation performed
    pub operation: ImportOperation,
}

impl MigratedItem {
    /// Create new result
    #[must_use]
    pub fn new(header: EntityHeader, result_header: EntityHeader, operation: ImportOperation) -> Self {
        Self {
            header,
            result_header,
            operation,
        }
    }
}

impl Display for MigratedItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> #{}", self.operation, self.header, self.result_header.id())
    }
}
