//! Shared vocabulary of the semgraph workspace.
//!
//! Holds the snapshot record types ([`SnapshotFile`], [`NodeRecord`],
//! [`EdgeRecord`], [`Location`]), the [`SemgraphConfig`] read from
//! `.semgraph.toml` with its project resolution, the [`ScgError`] type every
//! crate returns, and [`OutputFormat`].

mod config;
mod error;
mod types;

pub use config::{
    ContextConfig, EmbeddingConfig, ProjectConfig, ResolvedProject, SemgraphConfig,
    SnapshotConfig, PROJECT_ENV_VAR,
};
pub use error::ScgError;
pub use types::{EdgeRecord, Location, NodeRecord, OutputFormat, SnapshotFile};

/// A convenience `Result` type for semgraph operations.
pub type Result<T> = std::result::Result<T, ScgError>;
