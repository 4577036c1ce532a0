//! Dry-run conflict detection.
//!
//! The detector asks each store for a non-mutating merge preview and
//! aggregates the answers into a single [`MergeConflicts`]. It snapshots both
//! stores before and after the previews and refuses to report a result if
//! either store drifted.

use tracing::{debug, info, warn};

use super::model::MergeConflicts;
use crate::errors::StoreError;
use crate::merge::MergeFailure;
use crate::store::{RowStore, StoreKind, TreeStore, VersionedStore};

/// Commit hash and merge flag of one store at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    commit_hash: String,
    merge_in_progress: bool,
}

async fn fingerprint<S: VersionedStore>(store: &S) -> Result<Fingerprint, StoreError> {
    Ok(Fingerprint {
        commit_hash: store.commit_hash().await?,
        merge_in_progress: store.merge_in_progress().await?,
    })
}

/// Read-only "would this merge conflict?" check across both stores.
pub struct ConflictDetector<'a, R, T> {
    row_store: &'a R,
    tree_store: &'a T,
}

impl<'a, R: RowStore, T: TreeStore> ConflictDetector<'a, R, T> {
    pub fn new(row_store: &'a R, tree_store: &'a T) -> Self {
        Self {
            row_store,
            tree_store,
        }
    }

    /// Report every conflict merging `source` into `target` would produce in
    /// either store. Leaves both stores exactly as found.
    pub async fn check_conflicts(
        &self,
        source: &str,
        target: &str,
    ) -> Result<MergeConflicts, MergeFailure> {
        info!(source, target, "checking merge conflicts (dry run)");

        let row_before = fingerprint(self.row_store).await?;
        let tree_before = fingerprint(self.tree_store).await?;

        // Both previews run even if the first fails, so the postcondition
        // check below always sees the final state.
        let row = self.row_store.preview_merge(source, target).await;
        let tree = self.tree_store.preview_merge(source, target).await;

        let row_after = fingerprint(self.row_store).await?;
        let tree_after = fingerprint(self.tree_store).await?;
        for (kind, before, after) in [
            (StoreKind::Row, &row_before, &row_after),
            (StoreKind::Tree, &tree_before, &tree_after),
        ] {
            if before != after {
                warn!(store = %kind, ?before, ?after, "dry run changed store state");
                return Err(MergeFailure::operation(format!(
                    "dry run changed the {kind} store (HEAD {} -> {}, merge in progress {} -> {})",
                    before.commit_hash,
                    after.commit_hash,
                    before.merge_in_progress,
                    after.merge_in_progress
                )));
            }
        }

        let row = row?;
        let tree = tree?;
        debug!(
            row_conflicts = row.row_conflicts.len(),
            tree_conflicts = tree.tree_conflicts.len(),
            "dry run previews complete"
        );

        let conflicts = row.combine(tree).with_hint();
        info!(count = conflicts.len(), "conflict check complete");
        Ok(conflicts)
    }
}
