//! Abort handling for an in-progress merge in either store.

use tracing::{info, warn};

use super::failure::MergeFailure;
use crate::store::{RowStore, TreeStore, VersionedStore};

/// Reverts conflicted, uncommitted merges in both stores.
pub struct AbortHandler<'a, R, T> {
    row_store: &'a R,
    tree_store: &'a T,
}

impl<'a, R: RowStore, T: TreeStore> AbortHandler<'a, R, T> {
    pub fn new(row_store: &'a R, tree_store: &'a T) -> Self {
        Self {
            row_store,
            tree_store,
        }
    }

    /// Abort whatever merge is in progress. Returns `true` if at least one
    /// store had something to abort; "nothing to abort" is not an error.
    /// Both stores are always attempted; the first revert error is returned
    /// after the second attempt.
    pub async fn abort_merge(&self) -> Result<bool, MergeFailure> {
        let row = abort_one(self.row_store).await;
        let tree = abort_one(self.tree_store).await;

        match (row, tree) {
            (Ok(row_aborted), Ok(tree_aborted)) => {
                let aborted = row_aborted || tree_aborted;
                info!(row_aborted, tree_aborted, "abort complete");
                Ok(aborted)
            }
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    }
}

async fn abort_one<S: VersionedStore>(store: &S) -> Result<bool, MergeFailure> {
    match store.abort_merge().await {
        Ok(aborted) => {
            if aborted {
                info!(store = %store.kind(), "aborted in-progress merge");
            }
            Ok(aborted)
        }
        Err(err) => {
            warn!(store = %store.kind(), error = %err, "abort failed");
            Err(MergeFailure::operation(format!(
                "failed to abort {} store merge: {err}",
                store.kind()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::MergeConflicts;
    use crate::fakes::FakeStore;
    use crate::store::MergeOptions;

    #[tokio::test]
    async fn test_nothing_to_abort() {
        let row = FakeStore::row();
        let tree = FakeStore::tree();
        let aborted = AbortHandler::new(&row, &tree).abort_merge().await.unwrap();
        assert!(!aborted);
    }

    #[tokio::test]
    async fn test_abort_is_idempotent() {
        let row = FakeStore::row()
            .conflicts_with("feature", MergeConflicts::paths(vec!["x".into()]));
        let tree = FakeStore::tree();
        row.attempt_merge("feature", &MergeOptions::default())
            .await
            .unwrap();
        assert!(row.is_merging());

        let handler = AbortHandler::new(&row, &tree);
        assert!(handler.abort_merge().await.unwrap());
        assert!(!handler.abort_merge().await.unwrap());
        assert!(!row.is_merging());
    }

    #[tokio::test]
    async fn test_second_store_attempted_after_failure() {
        let row = FakeStore::row().failing_abort("permission denied");
        let tree = FakeStore::tree()
            .conflicts_with("feature", MergeConflicts::paths(vec!["x".into()]));
        tree.attempt_merge("feature", &MergeOptions::default())
            .await
            .unwrap();

        let err = AbortHandler::new(&row, &tree).abort_merge().await.unwrap_err();
        assert!(err.to_string().contains("failed to abort row store merge"));
        assert!(!tree.is_merging());
    }
}
