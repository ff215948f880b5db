use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ScgError;

/// Environment variable consulted when no project is named explicitly.
pub const PROJECT_ENV_VAR: &str = "SEMGRAPH_PROJECT";

/// Top-level configuration loaded from `.semgraph.toml`.
///
/// Project resolution is layered: explicit name > `SEMGRAPH_PROJECT` >
/// `default_project`.
///
/// # Examples
///
/// ```
/// use semgraph_core::SemgraphConfig;
///
/// let config = SemgraphConfig::default();
/// assert_eq!(config.context.limit, 5);
/// assert_eq!(config.context.hops, 1);
/// assert!(config.projects.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgraphConfig {
    /// Project used when neither a flag nor the env var names one.
    pub default_project: Option<String>,
    /// Registered projects, keyed by short name.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
    /// Where snapshots live inside a project's data directory.
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    /// Text encoder settings for semantic search.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Retrieval defaults.
    #[serde(default)]
    pub context: ContextConfig,
}

impl SemgraphConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Io`] if the file cannot be read, or
    /// [`ScgError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use semgraph_core::SemgraphConfig;
    /// use std::path::Path;
    ///
    /// let config = SemgraphConfig::from_file(Path::new(".semgraph.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ScgError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgraph_core::SemgraphConfig;
    ///
    /// let toml = r#"
    /// [context]
    /// hops = 2
    /// "#;
    /// let config = SemgraphConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.context.hops, 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ScgError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve the active project, consulting `SEMGRAPH_PROJECT` when
    /// `explicit` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Config`] if no project can be selected or the
    /// selected name is not registered.
    pub fn resolve_project(&self, explicit: Option<&str>) -> Result<ResolvedProject, ScgError> {
        let env = std::env::var(PROJECT_ENV_VAR).ok();
        self.resolve_project_with(explicit, env.as_deref())
    }

    /// Resolve the active project from an explicit name and an env value.
    ///
    /// # Errors
    ///
    /// Returns [`ScgError::Config`] if no project can be selected or the
    /// selected name is not registered.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgraph_core::SemgraphConfig;
    ///
    /// let config = SemgraphConfig::from_toml(r#"
    /// default_project = "glide"
    /// [projects.glide]
    /// data_dir = "data/glide"
    /// "#).unwrap();
    /// let project = config.resolve_project_with(None, None).unwrap();
    /// assert_eq!(project.name, "glide");
    /// assert!(project.snapshot_dir.ends_with(".semanticgraphs"));
    /// ```
    pub fn resolve_project_with(
        &self,
        explicit: Option<&str>,
        env: Option<&str>,
    ) -> Result<ResolvedProject, ScgError> {
        let name = explicit
            .or(env)
            .or(self.default_project.as_deref())
            .ok_or_else(|| {
                ScgError::Config(format!(
                    "no project selected: pass --project, set {PROJECT_ENV_VAR}, or set default_project"
                ))
            })?;

        let Some(entry) = self.projects.get(name) else {
            let available = self
                .projects
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ScgError::Config(format!(
                "unknown project '{name}'. Available projects: {available}"
            )));
        };

        Ok(ResolvedProject {
            name: name.to_string(),
            data_dir: entry.data_dir.clone(),
            code_dir: entry.code_dir.clone(),
            snapshot_dir: entry.data_dir.join(&self.snapshots.dir_name),
        })
    }
}

/// A registered project.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use semgraph_core::ProjectConfig;
///
/// let project = ProjectConfig {
///     data_dir: PathBuf::from("data/glide"),
///     code_dir: Some(PathBuf::from("code/glide-4.5.0")),
/// };
/// assert!(project.code_dir.is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory holding the project's snapshot tree.
    pub data_dir: PathBuf,
    /// Directory holding the project's sources, if checked out.
    pub code_dir: Option<PathBuf>,
}

/// A project selected by [`SemgraphConfig::resolve_project`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProject {
    /// Short project name.
    pub name: String,
    /// Project data directory.
    pub data_dir: PathBuf,
    /// Project source directory, if configured.
    pub code_dir: Option<PathBuf>,
    /// `data_dir` joined with the snapshot directory name.
    pub snapshot_dir: PathBuf,
}

/// Snapshot discovery settings.
///
/// # Examples
///
/// ```
/// use semgraph_core::SnapshotConfig;
///
/// let config = SnapshotConfig::default();
/// assert_eq!(config.dir_name, ".semanticgraphs");
/// assert_eq!(config.extension, "json");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Directory under `data_dir` that holds snapshots.
    #[serde(default = "default_dir_name")]
    pub dir_name: String,
    /// Snapshot file extension, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_dir_name() -> String {
    ".semanticgraphs".into()
}

fn default_extension() -> String {
    "json".into()
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir_name: default_dir_name(),
            extension: default_extension(),
        }
    }
}

/// Configuration for the text encoder used by semantic search.
///
/// `provider = "none"` disables the encoder and search falls back to
/// keyword matching.
///
/// # Examples
///
/// ```
/// use semgraph_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.provider, "none");
/// assert_eq!(config.model, "text-embedding-3-small");
/// assert_eq!(config.batch_size, 64);
/// assert!(!config.is_enabled());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Encoder provider: `"none"` or `"openai"` (any OpenAI-compatible API).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// Model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// API key; falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Texts per encoder request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl EmbeddingConfig {
    /// Whether a provider other than `"none"` is configured.
    pub fn is_enabled(&self) -> bool {
        !self.provider.eq_ignore_ascii_case("none")
    }
}

fn default_embedding_provider() -> String {
    "none".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: None,
            base_url: None,
            batch_size: default_batch_size(),
        }
    }
}

/// Retrieval defaults used when the CLI does not override them.
///
/// # Examples
///
/// ```
/// use semgraph_core::ContextConfig;
///
/// let config = ContextConfig::default();
/// assert_eq!(config.limit, 5);
/// assert_eq!(config.hops, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Seed nodes returned by search (default: 5).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Expansion radius around the seeds (default: 1).
    #[serde(default = "default_hops")]
    pub hops: usize,
}

fn default_limit() -> usize {
    5
}

fn default_hops() -> usize {
    1
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            hops: default_hops(),
        }
    }
}
