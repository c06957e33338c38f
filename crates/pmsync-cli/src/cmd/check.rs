//! `pms check` — parse sources and validate the column mapping
//! without touching the network. A safe preflight for `sync --commit`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use pmsync_core::config::SyncConfig;
use pmsync_core::record::FieldMap;
use pmsync_core::store;
use serde_json::json;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Record sources to check; defaults to the configured sources.
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<PathBuf>,
}

struct SourceCheck {
    path: String,
    records: usize,
    pending: usize,
    error: Option<String>,
}

fn check_source(path: &Path, columns: &FieldMap) -> SourceCheck {
    let display = path.display().to_string();

    let collection = match store::load(path) {
        Ok(collection) => collection,
        Err(err) => {
            return SourceCheck {
                path: display,
                records: 0,
                pending: 0,
                error: Some(err.to_string()),
            };
        }
    };

    let fields = match columns.resolve(collection.schema()) {
        Ok(fields) => fields,
        Err(err) => {
            return SourceCheck {
                path: display,
                records: collection.len(),
                pending: 0,
                error: Some(err.to_string()),
            };
        }
    };

    let pending = collection
        .records()
        .iter()
        .filter(|record| {
            record
                .get(fields.remote_id)
                .is_none_or(|key| key.trim().is_empty())
        })
        .count();

    SourceCheck {
        path: display,
        records: collection.len(),
        pending,
        error: None,
    }
}

pub fn run_check(args: &CheckArgs, config: &SyncConfig, json: bool) -> Result<()> {
    let paths: Vec<PathBuf> = if args.sources.is_empty() {
        config.sources.iter().map(|entry| entry.path.clone()).collect()
    } else {
        args.sources.clone()
    };

    if paths.is_empty() {
        anyhow::bail!(
            "no record sources: pass paths on the command line or add [[sources]] to pmsync.toml"
        );
    }

    let checks: Vec<SourceCheck> = paths
        .iter()
        .map(|path| check_source(path, &config.columns))
        .collect();
    let problems = checks.iter().filter(|check| check.error.is_some()).count();

    if json {
        let payload: Vec<_> = checks
            .iter()
            .map(|check| {
                json!({
                    "path": check.path,
                    "records": check.records,
                    "pending": check.pending,
                    "error": check.error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json!({ "sources": payload }))?);
    } else {
        for check in &checks {
            match &check.error {
                Some(error) => println!("ERROR {} {error}", check.path),
                None => println!(
                    "OK {} ({} record(s), {} pending sync)",
                    check.path, check.records, check.pending
                ),
            }
        }
    }

    if problems > 0 {
        anyhow::bail!("{problems} source(s) failed validation");
    }
    Ok(())
}
