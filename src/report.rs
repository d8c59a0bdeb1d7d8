//! Renders published views to stdout.

use comfy_table::{
    presets,
    Attribute,
    Cell,
    Color,
    ContentArrangement,
    Table,
};
use eyre::Result;
use ledger_telemetry_config::ReportFormat;
use ledger_telemetry_core::{
    LogEntry,
    Severity,
    TelemetryView,
};
use std::fmt::Write as _;

/// Number of log entries shown below the tables.
const RECENT_LOG_ENTRIES: usize = 8;

/// Decides what of a view is new and turns it into text.
#[derive(Debug)]
pub struct Reporter {
    format: ReportFormat,
    cycles_seen: u64,
    last_log_id: u64,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            cycles_seen: 0,
            last_log_id: 0,
        }
    }

    /// Text to print for `view`, or `None` if nothing changed that this
    /// format shows.
    pub fn render(&mut self, view: &TelemetryView) -> Result<Option<String>> {
        match self.format {
            ReportFormat::Table | ReportFormat::Json => {
                if view.cycles_completed <= self.cycles_seen {
                    return Ok(None);
                }
                self.cycles_seen = view.cycles_completed;
                if self.format == ReportFormat::Json {
                    Ok(Some(serde_json::to_string_pretty(view)?))
                } else {
                    Ok(Some(format_view(view)))
                }
            }
            ReportFormat::Log => {
                let fresh = view
                    .log
                    .iter()
                    .filter(|entry| entry.id > self.last_log_id)
                    .collect::<Vec<_>>();
                let Some(newest) = fresh.last() else {
                    return Ok(None);
                };
                self.last_log_id = newest.id;
                Ok(Some(
                    fresh.iter().map(|entry| format_entry(entry)).collect::<Vec<_>>().join("\n"),
                ))
            }
        }
    }
}

fn header(title: impl ToString, color: Color) -> Vec<Cell> {
    vec![Cell::new(title).add_attribute(Attribute::Bold).fg(color)]
}

fn row(table: &mut Table, label: &str, value: impl ToString) {
    table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), Cell::new(value)]);
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn format_view(view: &TelemetryView) -> String {
    let mut out = String::new();

    let mut ledger = new_table();
    let status_color = if view.is_stale() { Color::Red } else { Color::Green };
    ledger.set_header(header(
        format!("LEDGER ({}, every {}ms)", view.scheduler, view.interval_ms),
        status_color,
    ));
    match &view.snapshot {
        Some(snapshot) => {
            row(&mut ledger, "Height", snapshot.height);
            row(&mut ledger, "Difficulty", format!("{:.2}", snapshot.difficulty));
            row(&mut ledger, "Mempool", snapshot.mempool_size);
            row(&mut ledger, "Total blocks", snapshot.total_blocks);
            row(&mut ledger, "Fetched", snapshot.fetched_at.format("%H:%M:%S"));
        }
        None => row(&mut ledger, "Snapshot", "no data yet"),
    }
    row(&mut ledger, "Avg block time", format!("{:.2}s", view.summary.average_block_time));
    row(&mut ledger, "Avg rate", format!("{:.2}", view.summary.average_rate));
    row(&mut ledger, "Latest rate", format!("{:.2}", view.summary.latest_rate));
    row(&mut ledger, "Transactions", view.summary.transactions_in_window);
    if let Some(info) = &view.network_info {
        row(&mut ledger, "Peers", info.peer_count);
        row(&mut ledger, "Protocol", &info.protocol_version);
    }
    if let Some(counters) = &view.api_counters {
        row(
            &mut ledger,
            "API requests",
            format!(
                "{} ({} ok, {} failed)",
                counters.total_requests, counters.successful_requests, counters.failed_requests
            ),
        );
        row(
            &mut ledger,
            "Mining",
            format!(
                "{} ({} starts, {} stops, {} txs submitted)",
                counters.is_mining, counters.mining_starts, counters.mining_stops, counters.transactions_submitted
            ),
        );
    }
    if let Some(cycle) = &view.last_cycle {
        row(&mut ledger, "Last cycle", format!("#{} {}", cycle.sequence, cycle.status));
    }
    if let Some(error) = &view.last_error {
        ledger.add_row(vec![
            Cell::new("Error").add_attribute(Attribute::Bold).fg(Color::Red),
            Cell::new(error).fg(Color::Red),
        ]);
    }
    let _ = writeln!(out, "{ledger}");

    if !view.chart.is_empty() {
        let mut blocks = new_table();
        blocks.set_header(vec!["Block", "Difficulty", "Txs", "Reward", "Block time", "Rate"]);
        for point in &view.chart {
            let network = view.network.iter().find(|n| n.index == point.index);
            blocks.add_row(vec![
                Cell::new(point.index),
                Cell::new(format!("{:.2}", point.difficulty)),
                Cell::new(point.tx_count),
                Cell::new(format!("{:.2}", point.reward)),
                Cell::new(network.map(|n| format!("{:.2}s", n.block_time)).unwrap_or_default()),
                Cell::new(network.map(|n| format!("{:.2}", n.rate)).unwrap_or_default()),
            ]);
        }
        let _ = writeln!(out, "{blocks}");
    }

    let recent = view.log.iter().rev().take(RECENT_LOG_ENTRIES).collect::<Vec<_>>();
    if !recent.is_empty() {
        let mut log = new_table();
        log.set_header(header("DIAGNOSTICS", Color::Cyan));
        for entry in recent.into_iter().rev() {
            log.add_row(vec![
                Cell::new(entry.emitted_at.format("%H:%M:%S")),
                Cell::new(entry.severity).fg(severity_color(entry.severity)),
                Cell::new(&entry.message),
            ]);
        }
        let _ = writeln!(out, "{log}");
    }

    out
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{} [{}] {}",
        entry.emitted_at.format("%H:%M:%S"),
        entry.severity,
        entry.message
    )
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Blue,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}
