//! Summary output
//!
//! Text mode prints the damage summary on stdout as soon as the scan ends.
//! JSON mode prints a single object on stdout once the run is over.

use std::io::Write;

use serde::Serialize;

use crate::check::{CheckOutcome, ScanReport};

use super::errors::CliResult;

/// Share of damaged records, in percent. A zero `total` reads as 0%.
pub fn damage_percent(damaged: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    damaged as f64 * 100.0 / total as f64
}

/// Writes `"<damaged>/<total> (<pct>%) headers damaged"`.
///
/// `total` is the larger of the store's own count and the number of records
/// actually visited, so a stale count never yields more than 100%.
pub fn write_scan_summary<W: Write>(out: &mut W, report: &ScanReport) -> CliResult<()> {
    let total = report.total_estimate().max(report.visited());
    writeln!(
        out,
        "{}/{} ({:.6}%) headers damaged",
        report.damaged_count(),
        total,
        damage_percent(report.damaged_count(), total)
    )?;
    out.flush()?;
    Ok(())
}

pub fn write_fixing<W: Write>(out: &mut W) -> CliResult<()> {
    writeln!(out, "fixing...")?;
    out.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    store: String,
    total_estimate: u64,
    check_only: bool,
    #[serde(flatten)]
    outcome: &'a CheckOutcome,
    exit_code: i32,
}

/// Writes the whole run as one JSON object followed by a newline.
pub fn write_json_summary<W: Write>(
    out: &mut W,
    store: &str,
    total_estimate: u64,
    check_only: bool,
    outcome: &CheckOutcome,
) -> CliResult<()> {
    let summary = JsonSummary {
        store: store.to_string(),
        total_estimate,
        check_only,
        outcome,
        exit_code: outcome.exit_code(),
    };
    serde_json::to_writer(&mut *out, &summary)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
