use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::diff::tree_diff::FlatTree;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::status::file_change::{
    FileChange, FileChangeType, FileState, IndexChangeType, WorkspaceChangeType,
};
use crate::artifacts::status::inspector::Inspector;
use crate::errors::{ErrorContext, ErrorKind, Result};
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub type FileStatSet = BTreeMap<PathBuf, EntryMetadata>;
pub type FileSet = BTreeSet<PathBuf>;

/// Per-path comparison of the HEAD tree, the index and the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusInfo {
    files: BTreeMap<PathBuf, FileChange>,
}

impl StatusInfo {
    /// Every path known to HEAD, the index or the working tree
    pub fn files(&self) -> &BTreeMap<PathBuf, FileChange> {
        &self.files
    }

    pub fn get(&self, path: &Path) -> Option<&FileChange> {
        self.files.get(path)
    }

    pub fn state(&self, path: &Path) -> Option<FileState> {
        self.get(path).map(FileChange::state)
    }

    /// Paths whose state is anything but unmodified
    pub fn changes(&self) -> impl Iterator<Item = (&PathBuf, &FileChange)> {
        self.files.iter().filter(|(_, change)| !change.is_unmodified())
    }

    pub fn is_clean(&self) -> bool {
        self.changes().next().is_none()
    }

    pub fn untracked(&self) -> impl Iterator<Item = &PathBuf> {
        self.files
            .iter()
            .filter(|(_, change)| change.workspace_change == WorkspaceChangeType::Untracked)
            .map(|(path, _)| path)
    }

    /// `XY path` lines; a path deleted from the index but present on disk
    /// also gets a `??` line
    pub fn porcelain(&self) -> String {
        let mut output = String::new();

        for (path, change) in self.changes() {
            let _ = writeln!(output, "{} {}", change, path.display());

            if change.workspace_change == WorkspaceChangeType::Untracked
                && change.index_change != IndexChangeType::None
            {
                let _ = writeln!(output, "?? {}", path.display());
            }
        }

        output
    }

    /// Human-oriented listing grouped by section
    pub fn long_format(&self) -> String {
        let staged = self
            .files
            .iter()
            .filter(|(_, change)| change.index_change != IndexChangeType::None)
            .map(|(path, change)| (path, FileChangeType::Index(change.index_change)))
            .collect::<Vec<_>>();
        let unstaged = self
            .files
            .iter()
            .filter(|(_, change)| {
                matches!(
                    change.workspace_change,
                    WorkspaceChangeType::Modified | WorkspaceChangeType::Deleted
                )
            })
            .map(|(path, change)| (path, FileChangeType::Workspace(change.workspace_change)))
            .collect::<Vec<_>>();
        let untracked = self.untracked().collect::<Vec<_>>();

        let mut output = String::new();

        if !staged.is_empty() {
            let _ = writeln!(output, "Changes to be committed:");
            for (path, label) in &staged {
                let _ = writeln!(output, "{}{}", label, path.display());
            }
            let _ = writeln!(output);
        }

        if !unstaged.is_empty() {
            let _ = writeln!(output, "Changes not staged for commit:");
            for (path, label) in &unstaged {
                let _ = writeln!(output, "{}{}", label, path.display());
            }
            let _ = writeln!(output);
        }

        if !untracked.is_empty() {
            let _ = writeln!(output, "Untracked files:");
            for path in &untracked {
                let _ = writeln!(output, "{:>8}{}", "", path.display());
            }
            let _ = writeln!(output);
        }

        if staged.is_empty() {
            let summary = match (unstaged.is_empty(), untracked.is_empty()) {
                (false, _) => "no changes added to commit",
                (true, false) => "nothing added to commit but untracked files present",
                (true, true) => "nothing to commit, working tree clean",
            };
            let _ = writeln!(output, "{summary}");
        }

        output
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl<'r> Status<'r> {
    /// Compare every path; reads only, the index is not refreshed
    pub fn initialize(&self, index: &Index) -> Result<StatusInfo> {
        let head_tree = self.repository.head_tree()?;
        let workspace_files = self.scan_workspace()?;
        let file_stats = self.stat_index_entries(index)?;
        let inspector = Inspector::new(self.repository.workspace());

        let paths = index
            .entries()
            .map(|entry| entry.name.clone())
            .chain(head_tree.keys().cloned())
            .chain(workspace_files.iter().cloned())
            .collect::<FileSet>();

        let mut files = BTreeMap::new();
        for path in paths {
            let change = self.check_path(
                &path,
                index,
                &head_tree,
                &file_stats,
                &workspace_files,
                &inspector,
            )?;
            files.insert(path, change);
        }

        Ok(StatusInfo { files })
    }

    fn scan_workspace(&self) -> Result<FileSet> {
        let files = self
            .repository
            .workspace()
            .list_files(None)
            .kind_context(ErrorKind::FileSystem, || "unable to list the working tree")?;

        Ok(files.into_iter().collect())
    }

    fn stat_index_entries(&self, index: &Index) -> Result<FileStatSet> {
        let mut file_stats = FileStatSet::new();

        for entry in index.entries() {
            let stat = self
                .repository
                .workspace()
                .stat_if_file(&entry.name)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to stat {}", entry.name.display())
                })?;

            if let Some(stat) = stat {
                file_stats.insert(entry.name.clone(), stat);
            }
        }

        Ok(file_stats)
    }

    fn check_path(
        &self,
        path: &Path,
        index: &Index,
        head_tree: &FlatTree,
        file_stats: &FileStatSet,
        workspace_files: &FileSet,
        inspector: &Inspector<'_>,
    ) -> Result<FileChange> {
        let index_entry = index.entry_by_path(path);

        let index_change =
            inspector.check_index_against_head_tree(index_entry, head_tree.get(path));

        let workspace_change = match index_entry {
            Some(_) => inspector
                .check_index_against_workspace(index_entry, file_stats.get(path))
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to compare {}", path.display())
                })?,
            None if workspace_files.contains(path) => WorkspaceChangeType::Untracked,
            None => WorkspaceChangeType::None,
        };

        Ok(FileChange {
            index_change,
            workspace_change,
        })
    }
}
