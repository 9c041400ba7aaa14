use crate::areas::database::ObjectStoreExt;
use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::checkout::conflict::{ConflictReport, ConflictType};
use crate::artifacts::diff::tree_diff::FlatTree;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::log::revision::Revision;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use bytes::Bytes;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    /// Move HEAD only
    Soft,
    /// Move HEAD and rewrite the index; the working tree is untouched
    #[default]
    Mixed,
    /// Move HEAD and rewrite both the index and the working tree
    ///
    /// Uncommitted changes to tracked files are discarded for good. Untracked
    /// files are kept: the reset is refused when one sits inside a directory
    /// that a restored file replaces, or where a restored file's parent
    /// directory has to go.
    Hard,
}

impl ResetMode {
    pub fn from_flags(soft: bool, hard: bool) -> Result<Self> {
        match (soft, hard) {
            (true, true) => Err(Error::user_input(
                "--soft and --hard cannot be used together",
            )),
            (true, false) => Ok(ResetMode::Soft),
            (false, true) => Ok(ResetMode::Hard),
            (false, false) => Ok(ResetMode::Mixed),
        }
    }
}

impl std::fmt::Display for ResetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self {
            ResetMode::Soft => "soft",
            ResetMode::Mixed => "mixed",
            ResetMode::Hard => "hard",
        };
        write!(f, "{mode}")
    }
}

impl Repository {
    /// Move HEAD to `revision`, then sync the index and working tree per `mode`
    ///
    /// The revision and target tree are fully resolved before anything changes.
    pub async fn reset(&self, revision: &str, mode: ResetMode) -> Result<ObjectId> {
        let target_oid = Revision::try_parse(revision)?.resolve(self)?;
        let target = self.load_commit(&target_oid).map_err(|err| {
            Error::user_input(format!("{revision} does not name a commit")).with_source(err)
        })?;
        let target_tree = self.load_tree_entries(target.tree_oid())?;

        let index = self.index();
        let mut index = index.lock().await;
        let _lock = index.acquire_lock()?;
        index.rehydrate()?;

        match mode {
            ResetMode::Soft => {}
            ResetMode::Mixed => {
                Self::reset_index(&mut index, &target_tree);
                index.write_updates()?;
            }
            ResetMode::Hard => {
                let old_head_tree = self.head_tree()?;
                self.check_untracked_obstructions(
                    &index,
                    &old_head_tree,
                    &target_tree,
                    "resetting",
                )?;
                self.hard_reset_to(&mut index, &old_head_tree, &target_tree)?;
                index.write_updates()?;
            }
        }

        self.refs().update_head(&target_oid)?;
        tracing::info!(oid = %target_oid, %mode, "reset HEAD");

        Ok(target_oid)
    }

    /// Replace every index entry with the target tree's, without stat data
    fn reset_index(index: &mut Index, target_tree: &FlatTree) {
        index.clear();
        for (path, entry) in target_tree {
            index.add(Self::index_entry_for(path, entry));
        }
    }

    /// Refuse when restoring `target_tree` would delete untracked files
    ///
    /// Paths in the index or in `old_head_tree` count as tracked. Nothing is
    /// modified.
    pub(crate) fn check_untracked_obstructions(
        &self,
        index: &Index,
        old_head_tree: &FlatTree,
        target_tree: &FlatTree,
        action: &str,
    ) -> Result<()> {
        let is_tracked =
            |path: &Path| index.entry_by_path(path).is_some() || old_head_tree.contains_key(path);
        let workspace = self.workspace();

        let mut buried = BTreeSet::new();
        let mut displaced = BTreeSet::new();
        for path in target_tree.keys() {
            let absolute = workspace.path().join(path);
            if absolute.is_dir() {
                let files = workspace
                    .list_files(Some(&absolute))
                    .kind_context(ErrorKind::FileSystem, || {
                        format!("unable to list {}", path.display())
                    })?;
                if files.iter().any(|file| !is_tracked(file.as_path())) {
                    buried.insert(path.clone());
                }
            }

            for parent in path.ancestors().skip(1) {
                if parent.as_os_str().is_empty() {
                    break;
                }
                if workspace.path().join(parent).is_file() && !is_tracked(parent) {
                    displaced.insert(parent.to_path_buf());
                }
            }
        }

        let report = [
            (ConflictType::StaleDirectory, &buried),
            (ConflictType::UntrackedRemoved, &displaced),
        ]
        .into_iter()
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(conflict_type, paths)| {
            ConflictReport {
                conflict_type,
                paths,
                action,
            }
            .to_string()
        })
        .collect::<Vec<_>>();

        if report.is_empty() {
            return Ok(());
        }
        Err(Error::user_input(format!(
            "\n{}\n\nAborting",
            report.join("\n\n")
        )))
    }

    /// Make the working tree and index match `target_tree`
    ///
    /// Files tracked by the index or by `old_head_tree` but absent from the
    /// target are deleted; untracked files are left alone. The index is updated
    /// in memory only.
    pub(crate) fn hard_reset_to(
        &self,
        index: &mut Index,
        old_head_tree: &FlatTree,
        target_tree: &FlatTree,
    ) -> Result<()> {
        let blobs = target_tree
            .iter()
            .map(|(path, entry)| {
                let blob = self
                    .database()
                    .load_blob(&entry.oid)
                    .kind_context(ErrorKind::Repository, || {
                        format!("unable to load blob {} for {}", entry.oid, path.display())
                    })?;
                Ok((path, entry, blob.into_content()))
            })
            .collect::<Result<Vec<(&PathBuf, _, Bytes)>>>()?;

        let stale = index
            .entries()
            .map(|entry| entry.name.clone())
            .chain(old_head_tree.keys().cloned())
            .filter(|path| !target_tree.contains_key(path))
            .collect::<BTreeSet<_>>();

        let workspace = self.workspace();
        for path in &stale {
            workspace
                .remove_file(path)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to remove {}", path.display())
                })?;
        }

        index.clear();
        for (path, entry, data) in blobs {
            workspace
                .write_file(path, &data, entry.mode)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to write {}", path.display())
                })?;
            let stat = workspace
                .stat_file(path)
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to stat {}", path.display())
                })?;

            index.add(IndexEntry::new(path.clone(), entry.oid.clone(), stat));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(false, false, ResetMode::Mixed)]
    #[case(true, false, ResetMode::Soft)]
    #[case(false, true, ResetMode::Hard)]
    fn flags_select_a_mode(#[case] soft: bool, #[case] hard: bool, #[case] expected: ResetMode) {
        assert_eq!(ResetMode::from_flags(soft, hard).unwrap(), expected);
    }

    #[test]
    fn both_flags_are_rejected() {
        let err = ResetMode::from_flags(true, true).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UserInput);
    }
}
