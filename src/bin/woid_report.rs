use std::{fmt::Write as _, fs, path::Path, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use woid_portal::{
    aggregation::{
        build_address_history_view, build_board, AddressHistoryView, BoardRowView, RowHighlight,
        TimelineEvent, TimelineFilter, ViewOptions,
    },
    models::{millis_to_utc, AddressBoardRow, AddressHistorySnapshot},
    services::upload::{extract_assignments, validate_extension, AssignmentRow, Row},
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    woid_portal::config::init_tracing(if cli.verbose { "debug" } else { "warn" }, false);

    let output = match cli.command {
        Commands::History(args) => run_history(&args, cli.json)?,
        Commands::Board(args) => run_board(&args, cli.json)?,
        Commands::CheckUpload(args) => run_check_upload(&args, cli.json)?,
    };
    print!("{output}");
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "woid-report",
    about = "Aggregate exported WOID portal data offline",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(short, long, global = true, action = ArgAction::SetTrue, help = "Log debug output")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate an address history snapshot
    History(HistoryArgs),
    /// Summarize project board rows
    Board(BoardArgs),
    /// Validate an already-parsed spreadsheet before upload
    CheckUpload(CheckUploadArgs),
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(help = "Snapshot JSON as returned by the address history query")]
    file: PathBuf,
    #[arg(long, default_value = "all", help = "Timeline filter: all, reports or tickets")]
    filter: TimelineFilter,
    #[arg(long, help = "Only show teams of this WOID")]
    woid: Option<String>,
    #[arg(
        long,
        default_value_t = 0,
        allow_hyphen_values = true,
        help = "Offset from UTC in minutes used to group events by day"
    )]
    utc_offset_minutes: i32,
}

#[derive(Args)]
struct BoardArgs {
    #[arg(help = "JSON array of address rows with WOIDs and teams")]
    file: PathBuf,
    #[arg(long, help = "Task force whose completion completes an address")]
    completing_team: Option<String>,
}

#[derive(Args)]
struct CheckUploadArgs {
    #[arg(help = "JSON array of rows, header row first")]
    file: PathBuf,
    #[arg(long, help = "Original spreadsheet file name; its extension is checked when given")]
    name: Option<String>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

fn run_history(args: &HistoryArgs, json: bool) -> Result<String> {
    let snapshot: AddressHistorySnapshot = read_json(&args.file)?;
    let utc_offset = FixedOffset::east_opt(args.utc_offset_minutes * 60)
        .ok_or_else(|| anyhow!("UTC offset out of range: {} minutes", args.utc_offset_minutes))?;
    let options = ViewOptions {
        filter: args.filter,
        selected_woid: args.woid.clone(),
        utc_offset,
    };
    let view = build_address_history_view(&snapshot, &options);

    if json {
        to_json(&view)
    } else {
        Ok(render_history(&view))
    }
}

fn format_millis(millis: f64) -> String {
    millis_to_utc(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "invalid date".to_string())
}

fn render_history(view: &AddressHistoryView) -> String {
    let mut out = String::new();
    let stats = &view.stats;
    let _ = writeln!(
        out,
        "Work orders: {} ({}% complete: {} complete, {} in progress, {} void, {} not started)",
        stats.total,
        stats.completion_percentage,
        stats.complete,
        stats.in_progress,
        stats.void,
        stats.not_started
    );

    for wo in &view.work_orders {
        let _ = writeln!(
            out,
            "  {:<16} {:<12} teams={} reports={} files={}",
            wo.work_order_id, wo.status, wo.team_count, wo.report_count, wo.file_count
        );
    }

    for panel in &view.team_panels {
        let _ = writeln!(out, "Teams on {}:", panel.work_order_id);
        for team in &panel.teams {
            let _ = writeln!(
                out,
                "  [{}] {} - {}",
                team.initials,
                team.name.as_deref().unwrap_or("Unnamed team"),
                team.label
            );
        }
    }

    let _ = writeln!(
        out,
        "Timeline ({}): {} events",
        view.timeline_filter, view.event_count
    );
    for day in &view.timeline {
        let _ = writeln!(out, "  {}", day.day);
        for event in &day.events {
            match event {
                TimelineEvent::Report {
                    work_order_id,
                    report,
                    ..
                } => {
                    let _ = writeln!(
                        out,
                        "    {} report on {} ({})",
                        format_millis(event.date()),
                        work_order_id,
                        report.completion_status.as_deref().unwrap_or("no status")
                    );
                }
                TimelineEvent::TicketUpdate {
                    ticket_id, update, ..
                } => {
                    let _ = writeln!(
                        out,
                        "    {} ticket {}: {} {}",
                        format_millis(event.date()),
                        ticket_id,
                        update.utility_company,
                        update.status
                    );
                }
            }
        }
    }

    for ticket in &view.utilities {
        let _ = writeln!(
            out,
            "Ticket {} ({} updates):",
            ticket.ticket_id, ticket.update_count
        );
        for utility in &ticket.utilities {
            let _ = writeln!(out, "  {}: {}", utility.company, utility.status);
        }
    }

    let _ = writeln!(out, "Files: {}", view.total_files);
    out
}

fn run_board(args: &BoardArgs, json: bool) -> Result<String> {
    let rows: Vec<AddressBoardRow> = read_json(&args.file)?;
    let board = build_board(&rows, args.completing_team.as_deref());

    if json {
        to_json(&board)
    } else {
        Ok(render_board(&board))
    }
}

fn render_board(rows: &[BoardRowView]) -> String {
    let mut out = String::new();
    let count = |highlight: RowHighlight| rows.iter().filter(|r| r.highlight == highlight).count();
    let _ = writeln!(
        out,
        "Addresses: {} (void {}, complete {}, open {})",
        rows.len(),
        count(RowHighlight::Void),
        count(RowHighlight::Complete),
        count(RowHighlight::Default)
    );
    for row in rows {
        let marker = match row.highlight {
            RowHighlight::Void => "VOID",
            RowHighlight::Complete => "DONE",
            RowHighlight::Default => "    ",
        };
        let _ = writeln!(out, "  {marker} {} ({} WOIDs)", row.address, row.woid_count);
    }
    out
}

fn run_check_upload(args: &CheckUploadArgs, json: bool) -> Result<String> {
    // The input itself is always JSON; only a given spreadsheet name is checked.
    if let Some(name) = &args.name {
        validate_extension(name).map_err(|e| anyhow!("{name}: {e}"))?;
    }

    let rows: Vec<Row> = read_json(&args.file)?;
    let assignments = extract_assignments(&rows).map_err(|e| anyhow!(e.to_string()))?;

    if json {
        to_json(&assignments)
    } else {
        Ok(render_assignments(&assignments, rows.len().saturating_sub(1)))
    }
}

fn render_assignments(assignments: &[AssignmentRow], data_rows: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} of {} rows ready for upload",
        assignments.len(),
        data_rows
    );
    for row in assignments {
        let _ = writeln!(out, "  {} -> {}", row.work_order_id, row.address);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(value: serde_json::Value, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(value.to_string().as_bytes()).unwrap();
        file
    }

    fn snapshot() -> serde_json::Value {
        json!({
            "woidAssignments": [
                { "workOrderId": "W-1", "address": "1 Main St" },
                { "workOrderId": "W-2", "address": "1 Main St" }
            ],
            "taskForceAssignments": [
                { "workOrderId": "W-1", "teams": [{ "taskForceName": "splice", "status": "Complete" }] },
                { "workOrderId": "W-2", "teams": [{ "taskForceName": "boring", "status": "In Progress" }] }
            ],
            "dailyReports": [{
                "workOrderId": "W-1",
                "reports": [{ "_creationTime": 1_709_640_000_000.0, "completionStatus": "Complete" }]
            }],
            "tickets": [{
                "ticketId": "T-1",
                "updates": [{ "_creationTime": 1_709_726_400_000.0, "utilityCompany": "Gas Co", "status": "Clear" }]
            }],
            "files": []
        })
    }

    #[test]
    fn history_report_summarizes_snapshot() {
        let file = write_json(snapshot(), ".json");
        let args = HistoryArgs {
            file: file.path().to_path_buf(),
            filter: TimelineFilter::All,
            woid: None,
            utc_offset_minutes: 0,
        };

        let out = run_history(&args, false).unwrap();
        assert!(out.contains("Work orders: 2 (50% complete"));
        assert!(out.contains("[SP] splice - Complete"));
        assert!(out.contains("Timeline (all): 2 events"));
        assert!(out.contains("Wed Mar 06 2024"));
        assert!(out.contains("Gas Co: Clear"));
    }

    #[test]
    fn history_json_honours_filter_and_woid() {
        let file = write_json(snapshot(), ".json");
        let args = HistoryArgs {
            file: file.path().to_path_buf(),
            filter: TimelineFilter::Tickets,
            woid: Some("W-2".into()),
            utc_offset_minutes: -300,
        };

        let out: serde_json::Value = serde_json::from_str(&run_history(&args, true).unwrap()).unwrap();
        assert_eq!(out["eventCount"], 1);
        assert_eq!(out["teamPanels"].as_array().unwrap().len(), 1);
        assert_eq!(out["teamPanels"][0]["workOrderId"], "W-2");
    }

    #[test]
    fn history_rejects_out_of_range_offset() {
        let file = write_json(snapshot(), ".json");
        let args = HistoryArgs {
            file: file.path().to_path_buf(),
            filter: TimelineFilter::All,
            woid: None,
            utc_offset_minutes: 100_000,
        };
        assert!(run_history(&args, false).is_err());
    }

    #[test]
    fn board_counts_highlights() {
        let file = write_json(
            json!([
                { "address": "1 Main St", "woids": [{ "workOrderId": "W-1", "teams": [{ "taskForceId": "tf-1", "status": "complete" }] }] },
                { "address": "2 Main St", "woids": [{ "workOrderId": "W-2", "teams": [{ "status": "void" }] }] },
                { "address": "3 Main St" }
            ]),
            ".json",
        );
        let args = BoardArgs {
            file: file.path().to_path_buf(),
            completing_team: Some("tf-1".into()),
        };

        let out = run_board(&args, false).unwrap();
        assert!(out.starts_with("Addresses: 3 (void 1, complete 1, open 1)"));
        assert!(out.contains("VOID 2 Main St (1 WOIDs)"));
    }

    #[test]
    fn check_upload_checks_only_a_given_spreadsheet_name() {
        let file = write_json(
            json!([["Address", "WOID"], ["1 Main St", "W-1"], ["", "W-2"]]),
            ".json",
        );
        let args = CheckUploadArgs {
            file: file.path().to_path_buf(),
            name: Some("assignments.xlsx".into()),
        };
        let out = run_check_upload(&args, false).unwrap();
        assert!(out.starts_with("1 of 2 rows ready for upload"));

        let without_name = CheckUploadArgs {
            file: file.path().to_path_buf(),
            name: None,
        };
        let out = run_check_upload(&without_name, false).unwrap();
        assert!(out.starts_with("1 of 2 rows ready for upload"));

        let wrong_kind = CheckUploadArgs {
            file: file.path().to_path_buf(),
            name: Some("assignments.pdf".into()),
        };
        let err = run_check_upload(&wrong_kind, false).unwrap_err();
        assert!(err.to_string().starts_with("assignments.pdf:"));
    }

    #[test]
    fn missing_file_is_reported() {
        let args = BoardArgs {
            file: PathBuf::from("/nonexistent/board.json"),
            completing_team: None,
        };
        let err = run_board(&args, false).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
