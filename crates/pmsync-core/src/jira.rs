//! Jira REST implementation of the ticket client capability.
//!
//! One endpoint is enough: `POST /rest/api/2/issue`. Authentication is
//! a personal access token sent as a Bearer header; the token value
//! comes from the environment, never from config files.

use serde::Deserialize;

use crate::client::{RemoteError, TicketClient, TicketKey, TicketKind};
use crate::config::RemoteConfig;

#[derive(Debug)]
pub struct JiraClient {
    endpoint: String,
    project_key: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedIssue {
    key: String,
}

impl JiraClient {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        project_key: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_key: project_key.into(),
            token: token.into(),
        }
    }

    /// Build a client from config, reading the access token from the
    /// configured environment variable. A missing or empty token fails
    /// here, before any creation attempt is made.
    pub fn from_env(remote: &RemoteConfig) -> Result<Self, RemoteError> {
        let token = std::env::var(&remote.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| RemoteError::MissingCredential {
                var: remote.token_env.clone(),
            })?;

        Ok(Self::new(
            remote.endpoint.clone(),
            remote.project_key.clone(),
            token,
        ))
    }

    const fn issue_type_name(kind: TicketKind) -> &'static str {
        match kind {
            TicketKind::Epic => "Epic",
            TicketKind::Issue => "Task",
        }
    }
}

impl TicketClient for JiraClient {
    fn create_ticket(
        &self,
        kind: TicketKind,
        summary: &str,
        description: &str,
    ) -> Result<TicketKey, RemoteError> {
        let url = format!("{}/rest/api/2/issue", self.endpoint);
        let body = serde_json::json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": summary,
                "description": description,
                "issuetype": { "name": Self::issue_type_name(kind) },
            }
        });

        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
            .send_json(body)
            .map_err(|err| match err {
                ureq::Error::Status(status, response) => RemoteError::Api {
                    status,
                    message: truncate(&response.into_string().unwrap_or_default()),
                },
                ureq::Error::Transport(transport) => {
                    RemoteError::Transport(transport.to_string())
                }
            })?;

        let created: CreatedIssue = response
            .into_json()
            .map_err(|err| RemoteError::Transport(format!("invalid response body: {err}")))?;

        tracing::info!(key = %created.key, %kind, "created ticket via Jira API");
        Ok(TicketKey::from(created.key))
    }
}

/// Keep API error bodies short enough for one report line.
fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_string()
    } else {
        let mut end = LIMIT;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_normalized() {
        let client = JiraClient::new("https://example.atlassian.net/", "FER", "token");
        assert_eq!(client.endpoint, "https://example.atlassian.net");
    }

    #[test]
    fn issue_type_name_maps_kinds() {
        assert_eq!(JiraClient::issue_type_name(TicketKind::Epic), "Epic");
        assert_eq!(JiraClient::issue_type_name(TicketKind::Issue), "Task");
    }

    #[test]
    fn from_env_fails_without_credential() {
        let remote = RemoteConfig {
            endpoint: "https://example.atlassian.net".to_string(),
            project_key: "FER".to_string(),
            token_env: "PMSYNC_TEST_TOKEN_THAT_DOES_NOT_EXIST".to_string(),
        };
        let err = JiraClient::from_env(&remote).expect_err("must fail");
        assert!(matches!(err, RemoteError::MissingCredential { .. }));
    }

    #[test]
    fn truncate_keeps_short_bodies_and_caps_long_ones() {
        assert_eq!(truncate("  bad request  "), "bad request");
        let long = "x".repeat(500);
        let capped = truncate(&long);
        assert!(capped.len() <= 203);
        assert!(capped.ends_with("..."));
    }
}
