//! `pms sync` — one reconciliation pass, dry-run by default.
//!
//! Client selection policy: a dry run always gets the simulated
//! client, so no remote state ever changes without `--commit`. A
//! commit run talks to Jira unless `--simulate` is given. The fake is
//! injected here, never inside the engine.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use pmsync_core::config::SyncConfig;
use pmsync_core::jira::JiraClient;
use pmsync_core::{RunMode, RunStatus, Runner, SimulatedClient, SourceSpec, TicketClient, TicketKind};

use crate::output;

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Record sources to reconcile; defaults to the configured sources.
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,

    /// Persist created ticket keys back to the sources.
    #[arg(long)]
    pub commit: bool,

    /// Use the built-in simulated ticket service instead of Jira.
    #[arg(long)]
    pub simulate: bool,

    /// Ticket kind for positional sources (epic|issue).
    #[arg(long, value_name = "KIND", default_value = "issue", value_parser = parse_kind)]
    pub kind: TicketKind,

    /// Override the configured ticket service endpoint.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override the configured remote project key.
    #[arg(long, value_name = "KEY")]
    pub project: Option<String>,
}

fn parse_kind(raw: &str) -> Result<TicketKind, String> {
    raw.parse()
}

/// Resolve the source list: positional paths win over config.
fn resolve_sources(args: &SyncArgs, config: &SyncConfig) -> Result<Vec<SourceSpec>> {
    let sources: Vec<SourceSpec> = if args.sources.is_empty() {
        config
            .sources
            .iter()
            .map(|entry| SourceSpec {
                path: entry.path.clone(),
                kind: entry.kind,
            })
            .collect()
    } else {
        args.sources
            .iter()
            .map(|path| SourceSpec {
                path: path.clone(),
                kind: args.kind,
            })
            .collect()
    };

    if sources.is_empty() {
        anyhow::bail!(
            "no record sources: pass paths on the command line or add [[sources]] to pmsync.toml"
        );
    }
    Ok(sources)
}

pub fn run_sync(args: &SyncArgs, config: &SyncConfig, json: bool) -> Result<()> {
    let mode = if args.commit {
        RunMode::Commit
    } else {
        RunMode::DryRun
    };

    let sources = resolve_sources(args, config)?;

    let mut remote = config.remote.clone();
    if let Some(endpoint) = &args.endpoint {
        remote.endpoint.clone_from(endpoint);
    }
    if let Some(project) = &args.project {
        remote.project_key.clone_from(project);
    }

    let client: Box<dyn TicketClient> = if args.simulate || mode == RunMode::DryRun {
        Box::new(SimulatedClient::new(remote.project_key.clone()))
    } else {
        if remote.endpoint.trim().is_empty() {
            anyhow::bail!(
                "no ticket service endpoint configured: set [remote].endpoint or pass --endpoint"
            );
        }
        // Fails here if the token variable is unset, before any record
        // is touched.
        Box::new(JiraClient::from_env(&remote).context("cannot authenticate to the ticket service")?)
    };

    let runner = Runner::new(client.as_ref(), config.columns.clone(), mode);
    let report = runner.run(&sources)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }

    match report.status {
        RunStatus::Clean => Ok(()),
        RunStatus::CompletedWithFailures => {
            anyhow::bail!("{} record(s) failed to sync; re-run to retry them", report.failed)
        }
        RunStatus::PartialSuccess => anyhow::bail!(
            "tickets were created remotely but at least one source could not be written; \
             the keys above are not yet recorded locally"
        ),
    }
}
