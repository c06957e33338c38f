//! Human-readable rendering of run reports. One line per record, one
//! trailing totals line; stdout only, so it stays grep-friendly.

use pmsync_core::{RecordOutcome, RunMode, RunReport, SyncOutcome};

fn format_outcome(record: &RecordOutcome) -> String {
    match &record.outcome {
        SyncOutcome::Skipped { key } => format!("SKIP {} {key}", record.id),
        SyncOutcome::Created { key } => format!("CREATE {} {key}", record.id),
        SyncOutcome::Failed { reason } => format!("FAIL {} {reason}", record.id),
    }
}

fn format_totals(report: &RunReport) -> String {
    format!(
        "synced {} record(s): {} created, {} skipped, {} failed",
        report.created + report.skipped + report.failed,
        report.created,
        report.skipped,
        report.failed
    )
}

pub fn print_report(report: &RunReport) {
    for source in &report.sources {
        for record in &source.outcomes {
            println!("{}", format_outcome(record));
        }
    }

    println!("{}", format_totals(report));

    if report.mode == RunMode::DryRun {
        println!("dry run: no tickets were created and no files were written");
    }

    for source in &report.sources {
        if let Some(error) = &source.write_error {
            println!("WARNING {}: created keys not persisted ({error})", source.path);
        }
    }
}
