use std::path::PathBuf;

/// Errors that can occur across semgraph.
///
/// Library crates use this type directly; the binary converts to
/// `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use semgraph_core::ScgError;
///
/// let err = ScgError::Config("unknown project".into());
/// assert!(err.to_string().contains("unknown project"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ScgError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A single snapshot file could not be read or decoded.
    #[error("snapshot error in {}: {message}", path.display())]
    Snapshot {
        /// Path of the offending snapshot.
        path: PathBuf,
        /// Decoder or reader message.
        message: String,
    },

    /// Text encoder failure or malformed encoder output.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file or directory was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(help("check the project's data_dir in .semgraph.toml"))]
    FileNotFound(PathBuf),
}
