//! Run controller: one synchronization pass over one or more record
//! collections, with the dry-run / commit switch and the persistence
//! decision.
//!
//! Every source is loaded and validated before the first remote call,
//! so load-time errors abort the run with zero side effects. A failed
//! write-back after successful creations is the one partial state this
//! design accepts: it is reported as `PartialSuccess` and left to the
//! operator (see DESIGN.md, open questions).

use std::path::PathBuf;

use serde::Serialize;

use crate::client::{TicketClient, TicketKind};
use crate::engine::{self, RecordOutcome, SyncOutcome};
use crate::record::{Collection, FieldMap, FieldMapError, ResolvedFields};
use crate::store::{self, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    DryRun,
    Commit,
}

impl RunMode {
    #[must_use]
    pub const fn is_commit(self) -> bool {
        matches!(self, Self::Commit)
    }
}

/// One record source to reconcile: a CSV path plus the ticket kind its
/// records map to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub kind: TicketKind,
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("unusable header in {path}: {source}")]
    Fields {
        path: PathBuf,
        #[source]
        source: FieldMapError,
    },
}

/// Overall result class for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every record skipped or created, everything dirty persisted.
    Clean,
    /// At least one record failed remotely; nothing was lost locally.
    CompletedWithFailures,
    /// Tickets were created remotely but a write-back failed, so the
    /// local source does not yet record them.
    PartialSuccess,
}

#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub path: String,
    pub kind: TicketKind,
    pub outcomes: Vec<RecordOutcome>,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    /// True when this run wrote the collection back to disk.
    pub persisted: bool,
    pub write_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub sources: Vec<SourceReport>,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub status: RunStatus,
}

impl RunReport {
    /// Records whose creation failed, with reasons, for the caller to
    /// surface.
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.sources
            .iter()
            .flat_map(|source| &source.outcomes)
            .filter_map(|record| match &record.outcome {
                SyncOutcome::Failed { reason } => Some((record.id.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Ties the record store and the reconciliation engine together. Holds
/// the injected ticket client for the duration of one run; collections
/// never outlive it.
pub struct Runner<'client> {
    client: &'client dyn TicketClient,
    field_map: FieldMap,
    mode: RunMode,
}

impl<'client> Runner<'client> {
    #[must_use]
    pub const fn new(
        client: &'client dyn TicketClient,
        field_map: FieldMap,
        mode: RunMode,
    ) -> Self {
        Self {
            client,
            field_map,
            mode,
        }
    }

    /// Run one pass over `sources`, in the order given.
    ///
    /// All sources are loaded and their headers validated up front;
    /// any `NotFound`/`Format`-class error aborts before a single
    /// remote call is made. Per-record remote failures are isolated;
    /// write-back failures downgrade the run to `PartialSuccess`.
    pub fn run(&self, sources: &[SourceSpec]) -> Result<RunReport, RunError> {
        let mut loaded: Vec<(&SourceSpec, Collection, ResolvedFields)> =
            Vec::with_capacity(sources.len());
        for spec in sources {
            let collection = store::load(&spec.path)?;
            let fields =
                self.field_map
                    .resolve(collection.schema())
                    .map_err(|source| RunError::Fields {
                        path: spec.path.clone(),
                        source,
                    })?;
            loaded.push((spec, collection, fields));
        }

        let mut report = RunReport {
            mode: self.mode,
            sources: Vec::with_capacity(sources.len()),
            created: 0,
            skipped: 0,
            failed: 0,
            status: RunStatus::Clean,
        };

        for (spec, mut collection, fields) in loaded {
            let outcomes = engine::reconcile(&mut collection, &fields, spec.kind, self.client);
            let dirty = engine::is_dirty(&outcomes);

            let mut persisted = false;
            let mut write_error = None;
            if self.mode.is_commit() && dirty {
                match store::save(&spec.path, &collection) {
                    Ok(()) => persisted = true,
                    Err(err) => {
                        tracing::error!(
                            path = %spec.path.display(),
                            error = %err,
                            "write-back failed after remote creations"
                        );
                        write_error = Some(err.to_string());
                    }
                }
            }

            let mut source_report = SourceReport {
                path: spec.path.display().to_string(),
                kind: spec.kind,
                outcomes,
                created: 0,
                skipped: 0,
                failed: 0,
                persisted,
                write_error,
            };
            for record in &source_report.outcomes {
                match record.outcome {
                    SyncOutcome::Created { .. } => source_report.created += 1,
                    SyncOutcome::Skipped { .. } => source_report.skipped += 1,
                    SyncOutcome::Failed { .. } => source_report.failed += 1,
                }
            }

            report.created += source_report.created;
            report.skipped += source_report.skipped;
            report.failed += source_report.failed;
            report.sources.push(source_report);
        }

        report.status = derive_status(&report.sources, report.failed);

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            status = ?report.status,
            "run complete"
        );

        Ok(report)
    }
}

/// A write-back failure outranks remote failures: tickets exist that
/// the local source does not record yet.
fn derive_status(sources: &[SourceReport], failed: usize) -> RunStatus {
    if sources.iter().any(|source| source.write_error.is_some()) {
        RunStatus::PartialSuccess
    } else if failed > 0 {
        RunStatus::CompletedWithFailures
    } else {
        RunStatus::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SimulatedClient;
    use std::fs;
    use tempfile::TempDir;

    const EPICS: &str = "ID,Title,Description,TicketID\n\
                         E1,Login flow,,\n\
                         E2,Billing,,FER-10\n";

    fn source(dir: &TempDir, name: &str, content: &str, kind: TicketKind) -> SourceSpec {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write test source");
        SourceSpec { path, kind }
    }

    #[test]
    fn dry_run_never_touches_the_source() {
        let dir = TempDir::new().expect("tempdir");
        let spec = source(&dir, "epics.csv", EPICS, TicketKind::Epic);
        let client = SimulatedClient::new("FER");

        let runner = Runner::new(&client, FieldMap::default(), RunMode::DryRun);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
        assert!(!report.sources[0].persisted);
        assert_eq!(
            fs::read_to_string(&spec.path).expect("read back"),
            EPICS,
            "dry run must not change a single byte"
        );
    }

    #[test]
    fn commit_persists_created_keys() {
        let dir = TempDir::new().expect("tempdir");
        let spec = source(&dir, "epics.csv", EPICS, TicketKind::Epic);
        let client = SimulatedClient::with_start("FER", 11);

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.status, RunStatus::Clean);
        assert!(report.sources[0].persisted);
        let bytes = fs::read_to_string(&spec.path).expect("read back");
        assert!(bytes.contains("E1,Login flow,,FER-11"), "got: {bytes}");
        assert!(bytes.contains("E2,Billing,,FER-10"));
    }

    #[test]
    fn commit_with_nothing_to_create_does_not_write() {
        let dir = TempDir::new().expect("tempdir");
        let all_synced = "ID,Title,Description,TicketID\nE2,Billing,,FER-10\n";
        let spec = source(&dir, "epics.csv", all_synced, TicketKind::Epic);
        let client = SimulatedClient::new("FER");

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.created, 0);
        assert!(!report.sources[0].persisted, "clean collection, no write");
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn missing_source_aborts_before_any_remote_call() {
        let dir = TempDir::new().expect("tempdir");
        let good = source(&dir, "epics.csv", EPICS, TicketKind::Epic);
        let missing = SourceSpec {
            path: dir.path().join("absent.csv"),
            kind: TicketKind::Issue,
        };
        let client = SimulatedClient::new("FER");

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let err = runner.run(&[good.clone(), missing]).expect_err("must fail");

        assert!(matches!(err, RunError::Store(StoreError::NotFound { .. })));
        assert_eq!(client.request_count(), 0, "no ticket may have been created");
        assert_eq!(
            fs::read_to_string(&good.path).expect("read back"),
            EPICS,
            "the loadable source must be untouched too"
        );
    }

    #[test]
    fn unusable_header_aborts_before_any_remote_call() {
        let dir = TempDir::new().expect("tempdir");
        let spec = source(
            &dir,
            "odd.csv",
            "Name,Notes\nLogin flow,needs work\n",
            TicketKind::Issue,
        );
        let client = SimulatedClient::new("FER");

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let err = runner.run(std::slice::from_ref(&spec)).expect_err("must fail");

        assert!(matches!(err, RunError::Fields { .. }), "got {err:?}");
        assert_eq!(client.request_count(), 0);
    }

    #[test]
    fn sources_are_processed_in_the_order_given() {
        let dir = TempDir::new().expect("tempdir");
        let epics = source(
            &dir,
            "epics.csv",
            "ID,Title,Description,TicketID\nE1,Login flow,,\n",
            TicketKind::Epic,
        );
        let backlog = source(
            &dir,
            "backlog.csv",
            "ID,Title,Description,TicketID\nT1,Fix login,,\n",
            TicketKind::Issue,
        );
        let client = SimulatedClient::new("FER");

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let report = runner.run(&[epics, backlog]).expect("run");

        // First seen, first keyed: the epic gets FER-1, the task FER-2.
        assert_eq!(
            report.sources[0].outcomes[0].outcome,
            SyncOutcome::Created {
                key: "FER-1".to_string()
            }
        );
        assert_eq!(
            report.sources[1].outcomes[0].outcome,
            SyncOutcome::Created {
                key: "FER-2".to_string()
            }
        );
    }

    #[test]
    fn commit_persists_survivors_when_one_record_fails() {
        struct FlakyClient {
            inner: SimulatedClient,
            poison_summary: String,
        }

        impl TicketClient for FlakyClient {
            fn create_ticket(
                &self,
                kind: TicketKind,
                summary: &str,
                description: &str,
            ) -> Result<crate::client::TicketKey, crate::client::RemoteError> {
                if summary == self.poison_summary {
                    return Err(crate::client::RemoteError::Api {
                        status: 500,
                        message: "internal error".to_string(),
                    });
                }
                self.inner.create_ticket(kind, summary, description)
            }
        }

        let dir = TempDir::new().expect("tempdir");
        let spec = source(
            &dir,
            "backlog.csv",
            "ID,Title,Description,TicketID\n\
             T1,Fix login,,\n\
             T2,Broken,,\n\
             T3,Add billing,,\n",
            TicketKind::Issue,
        );
        let client = FlakyClient {
            inner: SimulatedClient::new("FER"),
            poison_summary: "Broken".to_string(),
        };

        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.status, RunStatus::CompletedWithFailures);
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, 1);
        assert!(report.sources[0].persisted, "two creations make the file dirty");
        assert_eq!(report.failures(), vec![("T2", "ticket service returned 500: internal error")]);

        // The survivors' keys land on disk; the failed record's column
        // stays empty so the next run retries exactly that one.
        let bytes = fs::read_to_string(&spec.path).expect("read back");
        assert!(bytes.contains("T1,Fix login,,FER-1"), "got: {bytes}");
        assert!(bytes.contains("T2,Broken,,\n"), "got: {bytes}");
        assert!(bytes.contains("T3,Add billing,,FER-2"), "got: {bytes}");
    }

    #[cfg(unix)]
    #[test]
    fn failed_write_back_yields_partial_success_report() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().expect("tempdir");
        let sub = dir.path().join("pm");
        fs::create_dir(&sub).expect("mkdir");
        let path = sub.join("epics.csv");
        fs::write(&path, EPICS).expect("seed");

        fs::set_permissions(&sub, fs::Permissions::from_mode(0o555)).expect("chmod");
        // Permission bits do not bind every user (root ignores them);
        // only assert the failure path when staging really is blocked.
        if fs::write(sub.join("canary"), b"x").is_ok() {
            let _ = fs::remove_file(sub.join("canary"));
            let _ = fs::set_permissions(&sub, fs::Permissions::from_mode(0o755));
            return;
        }

        let spec = SourceSpec {
            path: path.clone(),
            kind: TicketKind::Epic,
        };
        let client = SimulatedClient::with_start("FER", 11);
        let runner = Runner::new(&client, FieldMap::default(), RunMode::Commit);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.created, 1);
        assert!(!report.sources[0].persisted);
        let write_error = report.sources[0]
            .write_error
            .as_deref()
            .expect("write error must be recorded");
        assert!(write_error.contains("failed to write"), "got: {write_error}");

        fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).expect("chmod back");
        assert_eq!(
            fs::read_to_string(&path).expect("read back"),
            EPICS,
            "a failed save leaves the previous bytes untouched"
        );
    }

    #[test]
    fn write_error_downgrades_the_run_to_partial_success() {
        let sources = vec![SourceReport {
            path: "pm/epics.csv".to_string(),
            kind: TicketKind::Epic,
            outcomes: vec![RecordOutcome {
                id: "E1".to_string(),
                outcome: SyncOutcome::Created {
                    key: "FER-11".to_string(),
                },
            }],
            created: 1,
            skipped: 0,
            failed: 0,
            persisted: false,
            write_error: Some("failed to write pm/epics.csv: disk full".to_string()),
        }];

        assert_eq!(derive_status(&sources, 0), RunStatus::PartialSuccess);
        // A write failure outranks per-record remote failures.
        assert_eq!(derive_status(&sources, 3), RunStatus::PartialSuccess);
    }

    #[test]
    fn status_without_write_errors_tracks_remote_failures() {
        assert_eq!(derive_status(&[], 0), RunStatus::Clean);
        assert_eq!(derive_status(&[], 2), RunStatus::CompletedWithFailures);
    }

    #[test]
    fn failures_are_listed_in_the_report() {
        struct AlwaysFails;
        impl TicketClient for AlwaysFails {
            fn create_ticket(
                &self,
                _kind: TicketKind,
                _summary: &str,
                _description: &str,
            ) -> Result<crate::client::TicketKey, crate::client::RemoteError> {
                Err(crate::client::RemoteError::Transport("timed out".to_string()))
            }
        }

        let dir = TempDir::new().expect("tempdir");
        let spec = source(&dir, "epics.csv", EPICS, TicketKind::Epic);

        let runner = Runner::new(&AlwaysFails, FieldMap::default(), RunMode::Commit);
        let report = runner.run(std::slice::from_ref(&spec)).expect("run");

        assert_eq!(report.status, RunStatus::CompletedWithFailures);
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "E1");
        assert!(failures[0].1.contains("timed out"));
        assert_eq!(
            fs::read_to_string(&spec.path).expect("read back"),
            EPICS,
            "nothing created means nothing written"
        );
    }
}
