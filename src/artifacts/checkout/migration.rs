//! Working tree and index migration
//!
//! Replays two change sets onto the repository: one onto the working tree
//! and one onto the index. Every touched path is checked for local changes
//! and every blob is loaded before the first file is written, so a refused
//! migration leaves nothing behind.
//!
//! ## Conflict Detection
//!
//! - Stale files: the index or the working tree differs from HEAD
//! - Stale directories: a directory stands where a file has to go
//! - Untracked overwrites: a file would replace an untracked file
//! - Untracked removals: an untracked file would be deleted

use crate::areas::database::ObjectStoreExt;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::conflict::{ConflictReport, ConflictType};
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::{ChangeSet, FlatTree, TreeChangeType};
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use crate::artifacts::status::inspector::Inspector;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Working tree action for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionType {
    Add,
    Delete,
    Modify,
}

/// Planned working tree actions; written files carry their content
pub type ActionsSet = BTreeMap<PathBuf, (ActionType, Option<(DatabaseEntry, Bytes)>)>;

pub type ConflictsSet = BTreeMap<ConflictType, BTreeSet<PathBuf>>;

pub struct Migration<'r> {
    repository: &'r Repository,
    index: &'r mut Index,
    inspector: Inspector<'r>,
    /// Tree the index and working tree are expected to match
    head_tree: &'r FlatTree,
    workspace_changes: ChangeSet,
    index_changes: ChangeSet,
    actions: ActionsSet,
    conflicts: ConflictsSet,
}

impl<'r> Migration<'r> {
    pub fn new(
        repository: &'r Repository,
        index: &'r mut Index,
        head_tree: &'r FlatTree,
        workspace_changes: ChangeSet,
        index_changes: ChangeSet,
    ) -> Self {
        Migration {
            repository,
            index,
            inspector: Inspector::new(repository.workspace()),
            head_tree,
            workspace_changes,
            index_changes,
            actions: ActionsSet::new(),
            conflicts: ConflictsSet::new(),
        }
    }

    pub fn actions(&self) -> &ActionsSet {
        &self.actions
    }

    /// Check, plan and apply; the index is updated in memory only
    pub fn apply_changes(&mut self) -> Result<()> {
        self.plan_changes()?;
        self.update_workspace()?;
        self.update_index()?;

        Ok(())
    }

    fn plan_changes(&mut self) -> Result<()> {
        let touched = self
            .workspace_changes
            .keys()
            .chain(self.index_changes.keys())
            .cloned()
            .collect::<BTreeSet<_>>();

        for path in touched {
            if let Some(conflict_type) = self.detect_conflict(&path)? {
                self.conflicts.entry(conflict_type).or_default().insert(path);
            }
        }

        if self.conflicts.values().any(|paths| !paths.is_empty()) {
            let report = self
                .conflicts
                .iter()
                .filter(|(_, paths)| !paths.is_empty())
                .map(|(&conflict_type, paths)| {
                    ConflictReport {
                        conflict_type,
                        paths,
                        action: "applying the stash",
                    }
                    .to_string()
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            return Err(Error::user_input(format!("\n{report}\n\nAborting")));
        }

        let changes = self
            .workspace_changes
            .iter()
            .map(|(path, change)| (path.clone(), change.clone()))
            .collect::<Vec<_>>();
        for (path, change) in changes {
            self.record_change(path, &change)?;
        }

        Ok(())
    }

    fn detect_conflict(&self, path: &Path) -> Result<Option<ConflictType>> {
        let entry = self.index.entry_by_path(path);
        let new_entry = self
            .workspace_changes
            .get(path)
            .and_then(TreeChangeType::new_entry);

        if self
            .inspector
            .check_index_against_head_tree(entry, self.head_tree.get(path))
            != IndexChangeType::None
        {
            return Ok(Some(ConflictType::StaleFile));
        }

        let stat = self
            .repository
            .workspace()
            .stat_if_file(path)
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to stat {}", path.display())
            })?;
        let is_directory = self.repository.path().join(path).is_dir();
        let conflict_type = ConflictType::classify(is_directory, entry, new_entry);

        let has_conflict = match (entry, stat) {
            (Some(entry), stat) => {
                self.inspector
                    .check_index_against_workspace(Some(entry), stat.as_ref())
                    .kind_context(ErrorKind::FileSystem, || {
                        format!("unable to compare {}", path.display())
                    })?
                    != WorkspaceChangeType::None
            }
            (None, Some(_)) => true,
            (None, None) => is_directory && new_entry.is_some(),
        };

        Ok(has_conflict.then_some(conflict_type))
    }

    fn record_change(&mut self, path: PathBuf, change: &TreeChangeType) -> Result<()> {
        let action = match change {
            TreeChangeType::Added(new_entry) => (ActionType::Add, Some(self.load(new_entry)?)),
            TreeChangeType::Modified { new, .. } => (ActionType::Modify, Some(self.load(new)?)),
            TreeChangeType::Deleted(_) => (ActionType::Delete, None),
        };

        self.actions.insert(path, action);
        Ok(())
    }

    fn load(&self, entry: &DatabaseEntry) -> Result<(DatabaseEntry, Bytes)> {
        let blob = self
            .repository
            .database()
            .load_blob(&entry.oid)
            .kind_context(ErrorKind::Repository, || {
                format!("unable to load blob {}", entry.oid)
            })?;

        Ok((entry.clone(), blob.into_content()))
    }

    fn update_workspace(&self) -> Result<()> {
        let workspace = self.repository.workspace();

        for (path, (action, content)) in &self.actions {
            match (action, content) {
                (ActionType::Delete, _) => workspace.remove_file(path),
                (_, Some((entry, data))) => workspace.write_file(path, data, entry.mode),
                (_, None) => Ok(()),
            }
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to update {}", path.display())
            })?;
        }

        Ok(())
    }

    fn update_index(&mut self) -> Result<()> {
        let changes = std::mem::take(&mut self.index_changes);

        for (path, change) in changes {
            match change.new_entry() {
                None => {
                    if self.index.is_directly_tracked(&path) {
                        self.index.remove(&path)?;
                    }
                }
                Some(entry) => {
                    let metadata = self.metadata_for(&path, entry)?;
                    self.index
                        .add(IndexEntry::new(path, entry.oid.clone(), metadata));
                }
            }
        }

        Ok(())
    }

    /// Fresh stat data when the file on disk now holds exactly this entry
    fn metadata_for(&self, path: &Path, entry: &DatabaseEntry) -> Result<EntryMetadata> {
        let written = self
            .actions
            .get(path)
            .and_then(|(_, content)| content.as_ref())
            .is_some_and(|(written, _)| written == entry);

        if !written {
            return Ok(EntryMetadata::unknown(entry.mode));
        }

        self.repository
            .workspace()
            .stat_file(path)
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to stat {}", path.display())
            })
    }
}
