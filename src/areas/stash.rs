//! Stash stack file
//!
//! `.git/stash` lists the shelved snapshots, most recent first, one
//! [`StashEntry`] per line. Every change rewrites the whole file atomically
//! while `.git/stash.lock` is held.

use crate::areas::lockfile::{self, Lockfile};
use crate::artifacts::stash::stash_entry::StashEntry;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use derive_new::new;
use std::path::Path;

#[derive(Debug, new)]
pub struct StashStack {
    /// Path to the stack file (typically `.git/stash`)
    path: Box<Path>,
}

impl StashStack {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries, most recent first
    pub fn entries(&self) -> Result<Vec<StashEntry>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::file_system("unable to read the stash stack").with_source(err));
            }
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
            .map(|(number, line)| {
                StashEntry::try_from(line).kind_context(ErrorKind::FileSystem, || {
                    format!("malformed stash entry on line {}", number + 1)
                })
            })
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.entries()?.is_empty())
    }

    /// Entry at `index`, 0 being the most recent
    pub fn get(&self, index: usize) -> Result<StashEntry> {
        let entries = self.entries()?;
        let count = entries.len();

        entries
            .into_iter()
            .nth(index)
            .ok_or_else(|| Self::out_of_range(index, count))
    }

    pub fn push(&self, entry: StashEntry) -> Result<()> {
        let _lock = self.lock()?;

        let mut entries = self.entries()?;
        entries.insert(0, entry);
        self.write(&entries)?;

        tracing::info!(entries = entries.len(), "pushed stash entry");
        Ok(())
    }

    /// Remove and return the entry at `index`
    pub fn remove(&self, index: usize) -> Result<StashEntry> {
        let _lock = self.lock()?;

        let mut entries = self.entries()?;
        if index >= entries.len() {
            return Err(Self::out_of_range(index, entries.len()));
        }

        let entry = entries.remove(index);
        self.write(&entries)?;

        tracing::info!(index, "dropped stash entry");
        Ok(entry)
    }

    fn lock(&self) -> Result<lockfile::LockGuard> {
        Lockfile::for_path(&self.path)
            .acquire()
            .kind_context(ErrorKind::FileSystem, || "unable to lock the stash stack")
    }

    fn write(&self, entries: &[StashEntry]) -> Result<()> {
        let content = entries
            .iter()
            .map(|entry| format!("{}\n", entry.to_line()))
            .collect::<String>();

        lockfile::write_atomically(&self.path, content.as_bytes())
            .kind_context(ErrorKind::FileSystem, || "unable to write the stash stack")
    }

    fn out_of_range(index: usize, count: usize) -> Error {
        Error::user_input(match count {
            0 => format!("stash@{{{index}}} does not exist: the stash is empty"),
            _ => format!("stash@{{{index}}} does not exist: valid indexes are 0..{count}"),
        })
    }
}
