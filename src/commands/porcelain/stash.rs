use crate::areas::database::ObjectStoreExt;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::diff::tree_diff::TreeDiff;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::stash::stash_entry::StashEntry;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};

impl Repository {
    /// Record the index and the tracked working tree files, then reset both to HEAD
    ///
    /// Untracked files are neither saved nor touched; saving is refused when
    /// restoring HEAD would delete one.
    pub async fn stash_save(&self, message: Option<&str>) -> Result<(StashEntry, Commit)> {
        let Some((head_oid, head_commit)) = self.head_commit()? else {
            return Err(Error::user_input(
                "you do not have the initial commit yet",
            ));
        };

        let index = self.index();
        let mut index = index.lock().await;
        let _lock = index.acquire_lock()?;
        index.rehydrate()?;

        let index_tree = self.write_tree(index.entries())?;
        let worktree_tree = self.write_worktree_tree(&index)?;

        if &index_tree == head_commit.tree_oid() && &worktree_tree == head_commit.tree_oid() {
            return Err(Error::user_input("no local changes to save"));
        }

        let head_tree = self.load_tree_entries(head_commit.tree_oid())?;
        self.check_untracked_obstructions(&index, &head_tree, &head_tree, "stashing")?;

        let message = message.map(str::trim).filter(|message| !message.is_empty());
        let title = match message {
            Some(message) => format!("On {}: {}", head_oid.to_short_oid(), message),
            None => format!(
                "WIP on {}: {}",
                head_oid.to_short_oid(),
                head_commit.short_message()
            ),
        };

        let snapshot = Commit::new(
            Some(head_oid.clone()),
            worktree_tree,
            self.config().author()?,
            title.clone(),
        );
        let snapshot_oid = self
            .database()
            .store_object(&snapshot)
            .kind_context(ErrorKind::Repository, || "unable to store stash snapshot")?;

        let entry = StashEntry::new(snapshot_oid, index_tree, Some(title));
        self.stash().push(entry.clone())?;

        self.hard_reset_to(&mut index, &head_tree, &head_tree)?;
        index.write_updates()?;

        Ok((entry, snapshot))
    }

    /// Replay the stash entry at `position` onto the working tree and the index
    ///
    /// The entry stays on the stack.
    pub async fn stash_apply(&self, position: usize) -> Result<StashEntry> {
        let entry = self.stash().get(position)?;
        let snapshot = self.load_commit(&entry.commit)?;
        let base_oid = snapshot.parent().ok_or_else(|| {
            Error::repository(format!(
                "stash snapshot {} has no parent",
                entry.commit.to_short_oid()
            ))
        })?;
        let base = self.load_commit(base_oid)?;

        let base_tree = self.load_tree_entries(base.tree_oid())?;
        let snapshot_tree = self.load_tree_entries(snapshot.tree_oid())?;
        let index_tree = self.load_tree_entries(&entry.index_tree)?;

        let workspace_changes = TreeDiff::between(&base_tree, &snapshot_tree).into_changes();
        let index_changes = TreeDiff::between(&base_tree, &index_tree).into_changes();

        let index = self.index();
        let mut index = index.lock().await;
        let _lock = index.acquire_lock()?;
        index.rehydrate()?;

        let head_tree = self.head_tree()?;
        Migration::new(
            self,
            &mut index,
            &head_tree,
            workspace_changes,
            index_changes,
        )
        .apply_changes()?;
        index.write_updates()?;

        tracing::info!(position, commit = %entry.commit, "applied stash entry");
        Ok(entry)
    }

    /// Every stash entry with its snapshot commit, most recent first
    pub fn stash_list(&self) -> Result<Vec<(StashEntry, Commit)>> {
        self.stash()
            .entries()?
            .into_iter()
            .map(|entry| -> Result<(StashEntry, Commit)> {
                let commit = self.load_commit(&entry.commit)?;
                Ok((entry, commit))
            })
            .collect()
    }

    pub async fn stash_drop(&self, position: usize) -> Result<StashEntry> {
        let entry = self.stash().remove(position)?;

        tracing::info!(position, commit = %entry.commit, "dropped stash entry");
        Ok(entry)
    }

    /// Tree of every index-tracked path as it currently exists on disk
    fn write_worktree_tree(&self, index: &Index) -> Result<ObjectId> {
        let workspace = self.workspace();
        let mut entries = Vec::new();

        for entry in index.entries() {
            let stat = workspace
                .stat_if_file(&entry.name)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to stat {}", entry.name.display())
                })?;
            let Some(stat) = stat else {
                continue;
            };

            let data = workspace
                .read_file(&entry.name)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to read {}", entry.name.display())
                })?;
            let oid = self.store_object(&data, ObjectType::Blob)?;

            entries.push(IndexEntry::new(entry.name.clone(), oid, stat));
        }

        self.write_tree(entries.iter())
    }
}
