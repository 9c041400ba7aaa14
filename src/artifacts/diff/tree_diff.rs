use crate::artifacts::database::database_entry::DatabaseEntry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Every file of a tree, keyed by its path from the tree root
pub type FlatTree = BTreeMap<PathBuf, DatabaseEntry>;

pub type ChangeSet = BTreeMap<PathBuf, TreeChangeType>;

#[derive(Debug, Clone, PartialEq)]
pub enum TreeChangeType {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl TreeChangeType {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(TreeChangeType::Added(new)),
            (Some(old), None) => Some(TreeChangeType::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(TreeChangeType::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Deleted(entry) => Some(entry),
            TreeChangeType::Modified { old, .. } => Some(old),
            TreeChangeType::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            TreeChangeType::Added(entry) => Some(entry),
            TreeChangeType::Modified { new, .. } => Some(new),
            TreeChangeType::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            TreeChangeType::Added(_) => 'A',
            TreeChangeType::Deleted(_) => 'D',
            TreeChangeType::Modified { .. } => 'M',
        }
    }
}

/// File-level differences between two flattened trees
#[derive(Debug, Default)]
pub struct TreeDiff {
    change_set: ChangeSet,
}

impl TreeDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(old: &FlatTree, new: &FlatTree) -> Self {
        let mut diff = Self::new();
        diff.compare(old, new);

        diff
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    pub fn is_empty(&self) -> bool {
        self.change_set.is_empty()
    }

    pub fn get_entries(&self, path: &Path) -> (Option<&DatabaseEntry>, Option<&DatabaseEntry>) {
        match self.change_set.get(path) {
            Some(change) => (change.old_entry(), change.new_entry()),
            None => (None, None),
        }
    }

    pub fn compare(&mut self, old: &FlatTree, new: &FlatTree) {
        self.detect_deletions(old, new);
        self.detect_additions(old, new);
    }

    fn detect_deletions(&mut self, old: &FlatTree, new: &FlatTree) {
        for (path, entry) in old {
            let other = new.get(path).cloned();

            if let Some(change) = TreeChangeType::from_entries(Some(entry.clone()), other) {
                self.change_set.insert(path.clone(), change);
            }
        }
    }

    fn detect_additions(&mut self, old: &FlatTree, new: &FlatTree) {
        for (path, entry) in new {
            if old.contains_key(path) {
                continue;
            }

            self.change_set
                .insert(path.clone(), TreeChangeType::Added(entry.clone()));
        }
    }
}
