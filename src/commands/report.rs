use crate::commands::db::{latest_counts, monthly_rollup};
use crate::models::rollup::{LatestCounts, MonthlyRollup};
use rusqlite::{Connection, Result};
use std::fmt::Write;
use std::path::Path;

/// Reads the rollups and renders them as plain text. Performs no writes.
pub fn render_report(conn: &Connection, db_path: Option<&Path>) -> Result<String> {
    let rollup = monthly_rollup(conn)?;
    let latest = latest_counts(conn)?;
    Ok(format_report(&rollup, &latest, db_path))
}

pub fn format_report(
    rollup: &[MonthlyRollup],
    latest: &[LatestCounts],
    db_path: Option<&Path>,
) -> String {
    let mut out = String::new();

    out.push_str("\n=== Historical monthly (per repo) ===\n");
    if rollup.is_empty() {
        out.push_str("(no data)\n");
    }
    for row in rollup {
        let _ = writeln!(
            out,
            "{} - {}: views={} | daily-uniques-sum={}",
            row.entity,
            row.year_month,
            format_count(row.total_views),
            format_count(row.summed_daily_uniques)
        );
    }

    out.push_str("\n=== Latest counts snapshots ===\n");
    if latest.is_empty() {
        out.push_str("(no data)\n");
    }
    for row in latest {
        let _ = writeln!(
            out,
            "{} [{}]: stars={} | forks={} | watchers={}",
            row.entity,
            row.date,
            format_count(row.stars),
            format_count(row.forks),
            format_count(row.watchers)
        );
    }

    if let Some(path) = db_path {
        let shown = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let _ = writeln!(out, "\nSQLite DB: {}", shown.display());
    }

    out
}

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
