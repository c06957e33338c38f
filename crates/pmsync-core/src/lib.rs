//! pmsync-core library.
//!
//! Reconciles local CSV work-tracking records (epics, backlog items)
//! against a remote ticket service: records without a remote ticket key
//! get one created and stamped back, records that already carry a key
//! are never re-submitted. Repeated runs are safe by construction.
//!
//! # Conventions
//!
//! - **Errors**: per-module `thiserror` enums; `anyhow::Result` only at
//!   config-loading boundaries.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod client;
pub mod config;
pub mod engine;
pub mod jira;
pub mod record;
pub mod run;
pub mod store;

pub use client::{RemoteError, SimulatedClient, TicketClient, TicketKey, TicketKind};
pub use engine::{RecordOutcome, SyncOutcome};
pub use run::{RunMode, RunReport, RunStatus, Runner, SourceSpec};
