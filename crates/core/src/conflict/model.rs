//! Conflict value types shared by both stores.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One conflicting row in the row store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowConflict {
    /// Table holding the row.
    pub table: String,
    /// Rendered primary key of the row.
    pub key: String,
    /// Our side of the row; `None` when the row was deleted on our side.
    pub ours: Option<Value>,
    /// Their side of the row; `None` when the row was deleted on their side.
    pub theirs: Option<Value>,
}

impl RowConflict {
    pub fn new(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            ours: None,
            theirs: None,
        }
    }

    /// Whether one side deleted the row while the other kept it.
    pub fn is_edit_delete(&self) -> bool {
        self.ours.is_some() != self.theirs.is_some()
    }
}

/// Conflicts detected by a merge attempt or a dry run, across both stores.
///
/// Non-empty exactly when at least one conflicting row or path was found.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergeConflicts {
    pub row_conflicts: Vec<RowConflict>,
    /// Conflicting paths in the tree store, relative to its root.
    pub tree_conflicts: Vec<String>,
    pub resolution_hint: Option<String>,
}

impl MergeConflicts {
    pub fn rows(row_conflicts: Vec<RowConflict>) -> Self {
        Self {
            row_conflicts,
            ..Self::default()
        }
    }

    pub fn paths(tree_conflicts: Vec<String>) -> Self {
        Self {
            tree_conflicts,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_conflicts.is_empty() && self.tree_conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.row_conflicts.len() + self.tree_conflicts.len()
    }

    pub fn has_row_conflicts(&self) -> bool {
        !self.row_conflicts.is_empty()
    }

    /// Distinct table names among the row conflicts, sorted.
    pub fn conflicting_tables(&self) -> Vec<&str> {
        self.row_conflicts
            .iter()
            .map(|c| c.table.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Merge another store's findings into this one. Any hint is dropped;
    /// call [`MergeConflicts::with_hint`] on the combined value.
    pub fn combine(mut self, other: MergeConflicts) -> Self {
        self.row_conflicts.extend(other.row_conflicts);
        self.tree_conflicts.extend(other.tree_conflicts);
        self.tree_conflicts.sort();
        self.tree_conflicts.dedup();
        self.resolution_hint = None;
        self
    }

    /// Attach the resolution hint computed from the current contents.
    pub fn with_hint(mut self) -> Self {
        self.resolution_hint = resolution_hint(&self);
        self
    }
}

// ---------------------------------------------------------------------------
// Hints
// ---------------------------------------------------------------------------

/// A one-line suggestion for the operator, or `None` when there is nothing
/// to resolve.
pub fn resolution_hint(conflicts: &MergeConflicts) -> Option<String> {
    if conflicts.is_empty() {
        return None;
    }

    if conflicts.has_row_conflicts() {
        let tables = conflicts.conflicting_tables();
        let noun = if tables.len() == 1 { "table" } else { "tables" };
        let edit_delete = conflicts.row_conflicts.iter().any(RowConflict::is_edit_delete);
        let mut hint = format!(
            "resolve {} conflicting row(s) in {} {} with the row store's conflict tooling, then re-run the merge",
            conflicts.row_conflicts.len(),
            noun,
            tables.join(", ")
        );
        if edit_delete {
            hint.push_str(" (some rows were deleted on one side)");
        }
        return Some(hint);
    }

    let count = conflicts.tree_conflicts.len();
    if count == 1 {
        Some(format!(
            "resolve the conflict in {} and commit, or run `merge --abort` to discard the attempt",
            conflicts.tree_conflicts[0]
        ))
    } else {
        Some(format!(
            "resolve {count} conflicting files and commit, or run `merge --abort`; \
             consider `--squash` if the branches have diverged heavily"
        ))
    }
}
