//! Graph and bundle error types

/// Errors raised while reading or writing bundles
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Bundle written by a newer format
    #[error("unsupported bundle format version {found}, this build reads up to {supported}")]
    UnsupportedFormat {
        /// Version found in the bundle
        found: u32,
        /// Newest version understood
        supported: u32,
    },

    /// Bundle JSON could not be read or written
    #[error("bundle serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
