use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConduitError, Result};

fn required_env(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ConduitError::Config(format!("missing required env var {key}")))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoConfig {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphCredentials {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub model_endpoint: String,
}

fn default_lance_db_path() -> PathBuf {
    PathBuf::from("./data/lance")
}

fn default_routes_db_path() -> PathBuf {
    PathBuf::from("./data/routes.db")
}

fn default_embedding_model() -> String {
    "voyage-code-2".to_string()
}

const fn default_embedding_dimension() -> usize {
    1536
}

const fn default_chunk_token_limit() -> usize {
    512
}

/// The single configuration object. Fixed constants (confidence thresholds)
/// live in [`crate::confidence`], not here, so nothing redeclares them.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub repos: Vec<RepoConfig>,

    #[serde(default = "default_lance_db_path")]
    pub lance_db_path: PathBuf,

    #[serde(default = "default_routes_db_path")]
    pub routes_db_path: PathBuf,

    #[serde(default)]
    pub use_mock_graph: bool,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    #[serde(default = "default_chunk_token_limit")]
    pub chunk_token_limit: usize,

    #[serde(skip)]
    pub graph_credentials: Option<GraphCredentials>,
}

impl Config {
    /// Loads the TOML file at `path`, then applies `CONDUIT_*` environment
    /// overrides for secrets that should never live in a checked-in file.
    pub fn from_file_and_env(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)?;

        if config.repos.is_empty() {
            return Err(ConduitError::Config(
                "repos must be a non-empty list".to_string(),
            ));
        }

        if !config.use_mock_graph {
            config.graph_credentials = Some(GraphCredentials {
                uri: required_env("CONDUIT_GRAPH_URI")?,
                user: required_env("CONDUIT_GRAPH_USER")?,
                password: required_env("CONDUIT_GRAPH_PASSWORD")?,
                model_endpoint: required_env("CONDUIT_GRAPH_MODEL_ENDPOINT")?,
            });
        }

        Ok(config)
    }

    /// Logs the config with secrets redacted to their character counts, the
    /// same convention used for startup diagnostics across this stack.
    pub fn log_redacted(&self) {
        tracing::info!(
            repos = self.repos.len(),
            lance_db_path = %self.lance_db_path.display(),
            routes_db_path = %self.routes_db_path.display(),
            use_mock_graph = self.use_mock_graph,
            embedding_model = %self.embedding_model,
            embedding_dimension = self.embedding_dimension,
            graph_uri_chars = self.graph_credentials.as_ref().map(|c| c.uri.len()),
            graph_password_chars = self.graph_credentials.as_ref().map(|c| c.password.len()),
            "conduit config loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rejects_empty_repos() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "repos = []\nuse_mock_graph = true").unwrap();
        let err = Config::from_file_and_env(file.path()).unwrap_err();
        assert!(matches!(err, ConduitError::Config(_)));
    }

    #[test]
    fn loads_with_mock_graph_and_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            use_mock_graph = true
            [[repos]]
            name = "svc"
            path = "/repos/svc"
            "#
        )
        .unwrap();
        let config = Config::from_file_and_env(file.path()).unwrap();
        assert_eq!(config.repos.len(), 1);
        assert_eq!(config.lance_db_path, PathBuf::from("./data/lance"));
        assert_eq!(config.routes_db_path, PathBuf::from("./data/routes.db"));
        assert!(config.graph_credentials.is_none());
    }
}
