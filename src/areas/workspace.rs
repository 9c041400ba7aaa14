use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use anyhow::Context;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const GIT_DIR: &str = ".git";

/// Working tree rooted at the repository path
///
/// Every path taken or returned by this type is relative to the root unless
/// stated otherwise.
#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files under `root` (an absolute path; the whole tree when `None`), sorted
    ///
    /// `.git` is never descended into.
    pub fn list_files(&self, root: Option<&Path>) -> anyhow::Result<Vec<PathBuf>> {
        let root = root.unwrap_or(&self.path);

        if !root.exists() {
            anyhow::bail!("The specified path does not exist: {}", root.display());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != GIT_DIR);

        for entry in walker {
            let entry = entry.with_context(|| format!("Unable to list {}", root.display()))?;
            if entry.file_type().is_file() {
                files.push(self.relative_path(entry.path())?);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Express `path` (absolute or root-relative) relative to the root
    ///
    /// Fails for paths outside the working tree or inside `.git`.
    pub fn relative_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let absolute = Self::normalize(&self.path.join(path));

        let relative = absolute
            .strip_prefix(&self.path)
            .map(Path::to_path_buf)
            .map_err(|_| {
                anyhow::anyhow!("'{}' is outside repository", path.display())
            })?;

        if relative.starts_with(GIT_DIR) {
            anyhow::bail!("'{}' is inside the repository metadata", path.display());
        }

        Ok(relative)
    }

    /// Resolve `.` and `..` lexically, then symlinks through the longest existing ancestor
    fn normalize(path: &Path) -> PathBuf {
        let mut lexical = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    lexical.pop();
                }
                other => lexical.push(other),
            }
        }

        let existing = lexical
            .ancestors()
            .find(|ancestor| ancestor.exists())
            .unwrap_or(Path::new("/"));
        let rest = lexical.strip_prefix(existing).unwrap_or(Path::new(""));

        match existing.canonicalize() {
            Ok(canonical) if rest.as_os_str().is_empty() => canonical,
            Ok(canonical) => canonical.join(rest),
            Err(_) => lexical,
        }
    }

    pub fn read_file(&self, file_path: &Path) -> anyhow::Result<Bytes> {
        let file_path = self.path.join(file_path);

        let content = std::fs::read(&file_path)
            .with_context(|| format!("Unable to read {}", file_path.display()))?;

        Ok(Bytes::from(content))
    }

    pub fn stat_file(&self, file_path: &Path) -> anyhow::Result<EntryMetadata> {
        let absolute_path = self.path.join(file_path);
        let metadata = std::fs::metadata(&absolute_path)
            .with_context(|| format!("Unable to stat {}", absolute_path.display()))?;

        Ok(EntryMetadata::from_stat(&absolute_path, &metadata))
    }

    /// Stat data when `file_path` is a regular file, `None` when nothing or a directory is there
    pub fn stat_if_file(&self, file_path: &Path) -> anyhow::Result<Option<EntryMetadata>> {
        let absolute_path = self.path.join(file_path);

        match std::fs::metadata(&absolute_path) {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some(EntryMetadata::from_stat(&absolute_path, &metadata)))
            }
            Ok(_) => Ok(None),
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Unable to stat {}", absolute_path.display()))
            }
        }
    }

    /// Create or overwrite a file, making room for it if a file or directory is in the way
    pub fn write_file(&self, file_path: &Path, data: &[u8], mode: EntryMode) -> anyhow::Result<()> {
        let absolute_path = self.path.join(file_path);

        // a file standing where a parent directory has to go
        let mut parents = file_path
            .ancestors()
            .skip(1)
            .filter(|parent| !parent.as_os_str().is_empty())
            .collect::<Vec<_>>();
        parents.reverse();
        for parent in parents {
            let parent_path = self.path.join(parent);
            if parent_path.is_file() {
                std::fs::remove_file(&parent_path)
                    .with_context(|| format!("Failed to remove file: {}", parent_path.display()))?;
            }
        }

        if absolute_path.is_dir() {
            std::fs::remove_dir_all(&absolute_path).with_context(|| {
                format!("Failed to remove existing directory: {}", absolute_path.display())
            })?;
        }

        if let Some(parent) = absolute_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(&absolute_path, data)
            .with_context(|| format!("Failed to write to file: {}", absolute_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(mode.permissions());
            std::fs::set_permissions(&absolute_path, permissions).with_context(|| {
                format!("Failed to set permissions for file: {}", absolute_path.display())
            })?;
        }

        Ok(())
    }

    /// Delete a file and any parent directories left empty
    pub fn remove_file(&self, file_path: &Path) -> anyhow::Result<()> {
        let absolute_path = self.path.join(file_path);

        if absolute_path.is_file() {
            std::fs::remove_file(&absolute_path)
                .with_context(|| format!("Failed to remove file: {}", absolute_path.display()))?;
        }

        for parent in file_path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }

            let parent_path = self.path.join(parent);
            let is_empty = parent_path
                .read_dir()
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                break;
            }

            std::fs::remove_dir(&parent_path).with_context(|| {
                format!("Failed to remove directory: {}", parent_path.display())
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn root() -> TempDir {
        TempDir::new().unwrap()
    }

    fn workspace(root: &TempDir) -> Workspace {
        Workspace::new(root.path().canonicalize().unwrap().into_boxed_path())
    }

    #[rstest]
    fn listing_skips_git_metadata_and_sorts(root: TempDir) {
        root.child("b.txt").write_str("b").unwrap();
        root.child("a/c.txt").write_str("c").unwrap();
        root.child(".git/HEAD").write_str("").unwrap();
        root.child("empty").create_dir_all().unwrap();

        let files = workspace(&root).list_files(None).unwrap();

        assert_eq!(files, vec![PathBuf::from("a/c.txt"), PathBuf::from("b.txt")]);
    }

    #[rstest]
    fn listing_a_subdirectory_keeps_root_relative_paths(root: TempDir) {
        root.child("a/b/c.txt").write_str("c").unwrap();
        root.child("d.txt").write_str("d").unwrap();
        let workspace = workspace(&root);

        let files = workspace
            .list_files(Some(&workspace.path().join("a")))
            .unwrap();

        assert_eq!(files, vec![PathBuf::from("a/b/c.txt")]);
    }

    #[rstest]
    #[case("a.txt", Some("a.txt"))]
    #[case("./dir/../a.txt", Some("a.txt"))]
    #[case("../outside.txt", None)]
    #[case(".git/index", None)]
    fn relative_paths_stay_inside_the_tree(
        root: TempDir,
        #[case] input: &str,
        #[case] expected: Option<&str>,
    ) {
        let relative = workspace(&root).relative_path(Path::new(input)).ok();

        assert_eq!(relative, expected.map(PathBuf::from));
    }

    #[rstest]
    fn written_files_get_their_mode(root: TempDir) {
        let workspace = workspace(&root);

        workspace
            .write_file(
                Path::new("bin/run.sh"),
                b"#!/bin/sh",
                EntryMode::File(FileMode::Executable),
            )
            .unwrap();

        let stat = workspace.stat_file(Path::new("bin/run.sh")).unwrap();
        assert_eq!(stat.mode, EntryMode::File(FileMode::Executable));
        assert_eq!(workspace.read_file(Path::new("bin/run.sh")).unwrap().to_vec(), b"#!/bin/sh");
    }

    #[rstest]
    fn writing_replaces_a_file_in_the_way(root: TempDir) {
        root.child("a").write_str("was a file").unwrap();
        let workspace = workspace(&root);

        workspace
            .write_file(Path::new("a/b.txt"), b"b", EntryMode::File(FileMode::Regular))
            .unwrap();

        root.child("a/b.txt").assert("b");
    }

    #[rstest]
    fn removing_prunes_empty_directories(root: TempDir) {
        root.child("a/b/c.txt").write_str("c").unwrap();
        root.child("a/keep.txt").write_str("k").unwrap();
        let workspace = workspace(&root);

        workspace.remove_file(Path::new("a/b/c.txt")).unwrap();

        root.child("a/b").assert(predicates::path::missing());
        root.child("a/keep.txt").assert(predicates::path::exists());
    }

    #[rstest]
    fn stat_if_file_ignores_directories(root: TempDir) {
        root.child("dir/x.txt").write_str("x").unwrap();
        let workspace = workspace(&root);

        assert!(workspace.stat_if_file(Path::new("dir")).unwrap().is_none());
        assert!(workspace.stat_if_file(Path::new("missing")).unwrap().is_none());
        assert!(workspace.stat_if_file(Path::new("dir/x.txt")).unwrap().is_some());
    }
}
