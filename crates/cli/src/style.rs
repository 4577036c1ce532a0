//! Shared styling for terminal output.

use console::Style;

/// Success line (green checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Error line (red cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Warning line (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Bold header.
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Label for a store (blue for rows, green for the tree).
pub fn store_label(kind: lockstep_core::StoreKind) -> String {
    match kind {
        lockstep_core::StoreKind::Row => Style::new().blue().bold().apply_to("row store").to_string(),
        lockstep_core::StoreKind::Tree => Style::new().green().bold().apply_to("tree store").to_string(),
    }
}

/// Merge-state indicator.
pub fn merge_state(in_progress: bool) -> String {
    if in_progress {
        format!("{} merge in progress", Style::new().yellow().apply_to("●"))
    } else {
        format!("{} clean", Style::new().dim().apply_to("○"))
    }
}

/// Abbreviate a commit hash for display.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
