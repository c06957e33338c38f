//! Remote ticket capability: the single operation the reconciliation
//! engine depends on, plus the deterministic fake used for dry runs
//! and tests.
//!
//! Creating a ticket is not idempotent from the service's perspective;
//! calling it twice for the same record creates two tickets. The
//! engine's skip rule exists precisely because of this.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of remote ticket a record maps to. Epics come from the
/// epics source, everything else is a plain issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketKind {
    Epic,
    #[default]
    Issue,
}

impl TicketKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Issue => "issue",
        }
    }
}

impl FromStr for TicketKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "epic" => Ok(Self::Epic),
            "issue" | "task" | "story" => Ok(Self::Issue),
            other => Err(format!("unknown ticket kind '{other}' (expected epic|issue)")),
        }
    }
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote-assigned ticket identifier, e.g. `FER-11`. Opaque to the
/// engine; written back verbatim into the record's remote-id column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketKey(String);

impl TicketKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for TicketKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for TicketKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("credential environment variable {var} is not set")]
    MissingCredential { var: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("ticket service returned {status}: {message}")]
    Api { status: u16, message: String },
}

/// The one capability the engine consumes. Implementations: the Jira
/// REST client ([`crate::jira::JiraClient`]) and [`SimulatedClient`].
pub trait TicketClient {
    fn create_ticket(
        &self,
        kind: TicketKind,
        summary: &str,
        description: &str,
    ) -> Result<TicketKey, RemoteError>;
}

/// Deterministic fake: hands out `<prefix>-<n>` keys in call order.
/// First seen, first keyed — callers relying on simulated keys get the
/// same assignment on every run over the same input.
#[derive(Debug)]
pub struct SimulatedClient {
    prefix: String,
    next: Cell<u64>,
    requests: Cell<usize>,
}

impl SimulatedClient {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_start(prefix, 1)
    }

    /// Start numbering at `start`, for scenarios where the source
    /// already carries keys below that number.
    #[must_use]
    pub fn with_start(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(start),
            requests: Cell::new(0),
        }
    }

    /// How many creation requests this client has served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }
}

impl TicketClient for SimulatedClient {
    fn create_ticket(
        &self,
        kind: TicketKind,
        summary: &str,
        _description: &str,
    ) -> Result<TicketKey, RemoteError> {
        self.requests.set(self.requests.get() + 1);
        let n = self.next.get();
        self.next.set(n + 1);

        let key = format!("{}-{n}", self.prefix);
        tracing::debug!(%kind, summary, %key, "simulated ticket creation");
        Ok(TicketKey(key))
    }
}
