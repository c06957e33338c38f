//! Reconciliation engine: the skip/create decision, applied to every
//! record in collection order.
//!
//! Invariant: a record whose remote-id field is non-empty is never
//! passed to the ticket client. That one rule is what makes repeated
//! runs safe, so it stays trivial — strictly sequential, one creation
//! attempt per record per run, no batching.

use serde::Serialize;

use crate::client::{TicketClient, TicketKind};
use crate::record::{Collection, ResolvedFields};

/// Per-record result of one reconciliation attempt. Transient: drives
/// reporting and the dirty check, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Skipped { key: String },
    Created { key: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub id: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Reconcile every record in order, returning one outcome per record.
///
/// A `RemoteError` on one record is recorded as `Failed` and the run
/// moves on; the record's remote-id field is left empty so the next
/// run retries it.
pub fn reconcile(
    collection: &mut Collection,
    fields: &ResolvedFields,
    kind: TicketKind,
    client: &dyn TicketClient,
) -> Vec<RecordOutcome> {
    let mut outcomes = Vec::with_capacity(collection.len());

    for record in collection.records_mut() {
        let id = record.get(fields.id).unwrap_or("").to_string();

        let existing = record.get(fields.remote_id).unwrap_or("");
        if !existing.trim().is_empty() {
            tracing::debug!(%id, key = existing, "record already has a ticket; skipping");
            outcomes.push(RecordOutcome {
                id,
                outcome: SyncOutcome::Skipped {
                    key: existing.to_string(),
                },
            });
            continue;
        }

        let summary = record.get(fields.title).unwrap_or("");
        let description = fields
            .description
            .and_then(|index| record.get(index))
            .unwrap_or("");

        match client.create_ticket(kind, summary, description) {
            Ok(key) => {
                record.set(fields.remote_id, key.as_str().to_string());
                tracing::info!(%id, %key, %kind, "created remote ticket");
                outcomes.push(RecordOutcome {
                    id,
                    outcome: SyncOutcome::Created {
                        key: key.into_string(),
                    },
                });
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "ticket creation failed");
                outcomes.push(RecordOutcome {
                    id,
                    outcome: SyncOutcome::Failed {
                        reason: err.to_string(),
                    },
                });
            }
        }
    }

    outcomes
}

/// A collection needs persisting iff this run created at least one
/// ticket.
#[must_use]
pub fn is_dirty(outcomes: &[RecordOutcome]) -> bool {
    outcomes
        .iter()
        .any(|outcome| matches!(outcome.outcome, SyncOutcome::Created { .. }))
}
