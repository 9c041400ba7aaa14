//! Lock files and atomic replacement
//!
//! Every mutable file under `.git` (the index, HEAD, the stash stack) is
//! guarded by a sibling `<name>.lock` file. A writer takes an exclusive
//! `file-guard` lock on it for the whole read-modify-write sequence and
//! replaces the target with a single rename, so readers only ever observe a
//! complete old or a complete new file.
//!
//! The lock file itself is never deleted.

use anyhow::Context;
use fake::rand;
use file_guard::{FileGuard, Lock};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Lockfile {
    path: PathBuf,
}

/// Exclusive ownership of a lock file, released on drop
#[derive(Debug)]
pub struct LockGuard {
    _guard: FileGuard<Box<File>>,
}

impl Lockfile {
    /// Lock file guarding `target` (`.git/index` is guarded by `.git/index.lock`)
    pub fn for_path(target: &Path) -> Self {
        let mut file_name = target
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".lock");

        Lockfile {
            path: target.with_file_name(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the exclusive lock is held
    pub fn acquire(&self) -> anyhow::Result<LockGuard> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Unable to open lock file {}", self.path.display()))?;

        let guard = file_guard::lock(Box::new(file), Lock::Exclusive, 0, 1)
            .with_context(|| format!("Unable to lock {}", self.path.display()))?;

        Ok(LockGuard { _guard: guard })
    }
}

/// Replace `path` with `content` through a temp file, fsync and rename
pub fn write_atomically(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file path {}", path.display()))?;
    let temp_path = dir.join(format!(".{file_name}.tmp-{}", rand::random::<u32>()));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| format!("Unable to create {}", temp_path.display()))?;

    let written = file
        .write_all(content)
        .and_then(|_| file.sync_all())
        .with_context(|| format!("Unable to write {}", temp_path.display()))
        .and_then(|_| {
            std::fs::rename(&temp_path, path)
                .with_context(|| format!("Unable to rename {} into place", temp_path.display()))
        });

    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }

    written
}
