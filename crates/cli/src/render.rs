//! Human-readable and JSON rendering of merge results.

use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;

use lockstep_core::report::{self, AbortReport, DryRunReport, StatusReport};
use lockstep_core::{MergeConflicts, MergeFailure, MergeOutcome};

use crate::style;

/// Widest rendered row value before it is cut.
const MAX_CELL_CHARS: usize = 60;

pub fn print_json<T: Serialize>(envelope: &T) -> Result<()> {
    let text = report::to_json(envelope).context("failed to serialize report")?;
    println!("{text}");
    Ok(())
}

/// Spinner on stderr, only when stderr is a terminal.
pub fn spinner(msg: String, enabled: bool) -> Option<ProgressBar> {
    if !enabled || !console::Term::stderr().is_term() {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(80));
    Some(spinner)
}

pub fn render_outcome(outcome: &MergeOutcome) {
    println!();
    println!("{}", style::success(&outcome.message));
    println!(
        "  row store  : {}",
        style::short_hash(&outcome.row_commit_hash)
    );
    println!(
        "  tree store : {}",
        style::short_hash(&outcome.tree_commit_hash)
    );
    println!();
}

pub fn render_failure(failure: &MergeFailure) {
    println!();
    match failure {
        MergeFailure::RowConflict(conflicts) => {
            println!(
                "{}",
                style::error("Merge stopped: row store conflicts. Neither store was committed.")
            );
            render_conflicts(conflicts);
        }
        MergeFailure::TreeConflict(conflicts) => {
            println!(
                "{}",
                style::error("Merge stopped: tree store conflicts. The row store was rolled back.")
            );
            render_conflicts(conflicts);
        }
        MergeFailure::RollbackFailed {
            detail,
            pre_merge_row_commit,
        } => {
            println!("{}", style::error("ROLLBACK FAILED: the stores may disagree."));
            println!("  {detail}");
            println!();
            println!(
                "{}",
                style::warn("Manual intervention required. Reset the row store with:")
            );
            println!("    dolt reset --hard {pre_merge_row_commit}");
        }
        MergeFailure::Operation { detail } => {
            println!("{}", style::error(detail));
        }
    }
    println!();
}

pub fn render_dry_run(report: &DryRunReport) {
    println!();
    if report.success {
        println!(
            "{}",
            style::success(&format!(
                "No conflicts: '{}' merges cleanly into '{}'",
                report.source_branch, report.target_branch
            ))
        );
    } else {
        println!(
            "{}",
            style::warn(&format!(
                "Merging '{}' into '{}' would conflict ({} item(s))",
                report.source_branch,
                report.target_branch,
                report.conflicts.len()
            ))
        );
        render_conflicts(&report.conflicts);
    }
    println!();
}

pub fn render_abort(report: &AbortReport) {
    if report.aborted {
        println!("{}", style::success(&report.message));
    } else {
        println!("{}", style::dim(&report.message));
    }
}

pub fn render_status(report: &StatusReport) {
    println!();
    println!("{}", style::header("Lockstep Status"));
    println!();
    for status in [&report.row_store, &report.tree_store] {
        println!("  {}", style::store_label(status.store));
        println!("    branch : {}", status.branch);
        println!("    HEAD   : {}", style::short_hash(&status.commit_hash));
        println!("    state  : {}", style::merge_state(status.merge_in_progress));
    }
    println!();
    if !report.aligned {
        println!(
            "{}",
            style::warn("Stores are on different branches; merges are refused until they match.")
        );
        println!();
    }
}

fn render_conflicts(conflicts: &MergeConflicts) {
    if !conflicts.row_conflicts.is_empty() {
        println!();
        println!(
            "{}",
            style::header(&format!("Row conflicts ({})", conflicts.row_conflicts.len()))
        );
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Table", "Key", "Ours", "Theirs"]);
        for c in &conflicts.row_conflicts {
            table.add_row(vec![
                Cell::new(&c.table),
                Cell::new(&c.key),
                Cell::new(cell_value(c.ours.as_ref())),
                Cell::new(cell_value(c.theirs.as_ref())),
            ]);
        }
        println!("{table}");
    }

    if !conflicts.tree_conflicts.is_empty() {
        println!();
        println!(
            "{}",
            style::header(&format!("File conflicts ({})", conflicts.tree_conflicts.len()))
        );
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Path"]);
        for path in &conflicts.tree_conflicts {
            table.add_row(vec![Cell::new(path)]);
        }
        println!("{table}");
    }

    if let Some(hint) = &conflicts.resolution_hint {
        println!();
        println!("{}", style::dim(&format!("hint: {hint}")));
    }
}

/// Compact one side of a row conflict for a table cell.
fn cell_value(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "(deleted)".to_string();
    };
    let text = value.to_string();
    if text.chars().count() <= MAX_CELL_CHARS {
        return text;
    }
    let cut: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_value_deleted() {
        assert_eq!(cell_value(None), "(deleted)");
    }

    #[test]
    fn test_cell_value_truncates() {
        let short = json!({"id": 1});
        assert_eq!(cell_value(Some(&short)), r#"{"id":1}"#);

        let long = json!({"body": "x".repeat(200)});
        let rendered = cell_value(Some(&long));
        assert_eq!(rendered.chars().count(), MAX_CELL_CHARS);
        assert!(rendered.ends_with('…'));
    }

    #[test]
    fn test_no_spinner_when_disabled() {
        assert!(spinner("merging".into(), false).is_none());
    }
}
