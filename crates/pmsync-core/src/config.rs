//! Sync configuration: explicit, file-loadable, CLI-overridable.
//!
//! Everything the original workflow kept as ambient globals (server
//! URL, credential variable, file paths) lives here as data passed to
//! the runner. The token itself never appears in config, only the name
//! of the environment variable that holds it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::client::TicketKind;
use crate::record::FieldMap;

pub const DEFAULT_CONFIG_FILE: &str = "pmsync.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub columns: FieldMap,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the ticket service, e.g. `https://x.atlassian.net`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_project_key")]
    pub project_key: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project_key: default_project_key(),
            token_env: default_token_env(),
        }
    }
}

fn default_project_key() -> String {
    "FER".to_string()
}

fn default_token_env() -> String {
    "JIRA_API_TOKEN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
    #[serde(default)]
    pub kind: TicketKind,
}

/// Load `path`, falling back to defaults when the file does not exist.
/// A file that exists but does not parse is an error; silently running
/// with defaults against a half-written config would be worse.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<SyncConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_config(&dir.path().join("pmsync.toml")).expect("defaults");
        assert_eq!(config.remote.project_key, "FER");
        assert_eq!(config.remote.token_env, "JIRA_API_TOKEN");
        assert!(config.sources.is_empty());
        assert_eq!(config.columns.remote_id, "TicketID");
    }

    #[test]
    fn full_config_parses() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("pmsync.toml");
        fs::write(
            &path,
            r#"
[remote]
endpoint = "https://example.atlassian.net"
project_key = "PM"
token_env = "PM_TOKEN"

[columns]
id = "EpicID"
remote_id = "JiraTicketID"

[[sources]]
path = "pm/epics.csv"
kind = "epic"

[[sources]]
path = "pm/sprint_backlog.csv"
"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("parse");
        assert_eq!(config.remote.endpoint, "https://example.atlassian.net");
        assert_eq!(config.remote.project_key, "PM");
        assert_eq!(config.columns.id, "EpicID");
        assert_eq!(config.columns.title, "Title", "unset columns keep defaults");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, TicketKind::Epic);
        assert_eq!(config.sources[1].kind, TicketKind::Issue, "kind defaults to issue");
    }

    #[test]
    fn unparseable_config_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("pmsync.toml");
        fs::write(&path, "[remote\nendpoint = ").expect("write config");
        assert!(load_config(&path).is_err());
    }
}
