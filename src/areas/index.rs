//! Index (staging area)
//!
//! The index tracks which files should be included in the next commit.
//! It maintains metadata about files including their mode, timestamps, and SHA-1 hashes.
//!
//! ## Index File Format
//!
//! The index file contains:
//! - Header: Signature, version, and entry count
//! - Entries: Sorted list of tracked files with metadata
//! - Checksum: SHA-1 hash of the entire index for integrity verification
//!
//! ## Data Structures
//!
//! - `entries`: Maps file paths to their index entries, ordered by the raw
//!   bytes of the path (`a.txt` sorts before `a/b.txt`)
//! - `children`: Maps directory paths to their children for efficient tree operations
//!
//! ## Locking
//!
//! Writers hold the `.git/index.lock` guard from [`Index::acquire_lock`] across
//! the whole load → mutate → persist sequence. The file itself is replaced by a
//! rename, so readers never need the lock.

use crate::areas::lockfile::{self, LockGuard, Lockfile};
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::HEADER_SIZE;
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use anyhow::anyhow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Staging area
///
/// Tracks files staged for the next commit along with their metadata.
/// The index is persisted to disk and uses checksums for integrity verification.
#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    /// Tracked files keyed by [`path_key`]
    entries: BTreeMap<Box<[u8]>, IndexEntry>,
    /// Directory hierarchy for efficient parent-child lookups
    children: BTreeMap<Box<Path>, BTreeSet<Box<Path>>>,
    /// Flag indicating if the index has been modified since loading
    changed: bool,
}

impl Index {
    /// Create a new empty index backed by `path` (typically `.git/index`)
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the cross-process index lock
    pub fn acquire_lock(&self) -> Result<LockGuard> {
        Lockfile::for_path(&self.path)
            .acquire()
            .kind_context(ErrorKind::FileSystem, || "unable to lock the index")
    }

    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries.get(path_key(path))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.changed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Load the index from disk
    ///
    /// A missing or empty file is an empty index. Any malformed content is
    /// reported without touching the entries already held in memory.
    pub fn rehydrate(&mut self) -> Result<()> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(Error::file_system("unable to read the index").with_source(err));
            }
        };

        let mut loaded = Index::new(self.path.clone());
        if !data.is_empty() {
            loaded
                .parse(data.as_slice())
                .kind_context(ErrorKind::FileSystem, || {
                    format!("corrupt index file {}", self.path.display())
                })
                .inspect_err(|err| tracing::warn!(error = %err, "rejected index file"))?;
        }

        *self = loaded;
        Ok(())
    }

    fn parse(&mut self, data: impl Read) -> anyhow::Result<()> {
        let mut reader = Checksum::new(data);
        let entries_count = Self::parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;

        reader.verify()
    }

    fn parse_header(reader: &mut Checksum<impl Read>) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;

        Ok(IndexHeader::deserialize(std::io::Cursor::new(header_bytes))?.entries_count)
    }

    /// Parse all entries from the index file
    ///
    /// Reads each entry, handling variable-length paths with 8-byte alignment.
    fn parse_entries(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<impl Read>,
    ) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();

            // the name is NUL terminated and padded, so a complete entry ends in 0
            while entry_bytes.last() != Some(&0) {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(std::io::Cursor::new(entry_bytes))?;
            if self.entries.contains_key(path_key(&entry.name)) {
                return Err(anyhow!("Duplicate index entry {}", entry.name.display()));
            }

            self.store_entry(&entry);
        }

        Ok(())
    }

    /// Check if a path is tracked directly in the index
    ///
    /// Returns true if the path is either a file entry or has children
    /// (is a directory with tracked files).
    pub fn is_directly_tracked(&self, path: &Path) -> bool {
        self.entries.contains_key(path_key(path)) || self.children.contains_key(path)
    }

    /// Remove any conflicting entries before adding a new entry
    ///
    /// Removes parent directories that might be file entries, and
    /// removes any children entries if this entry is becoming a file.
    fn discard_conflicts(&mut self, entry: &IndexEntry) {
        for parent in entry.parent_dirs() {
            self.remove_entry(parent);
        }
        self.remove_children(&entry.name);
    }

    fn store_entry(&mut self, entry: &IndexEntry) {
        self.entries
            .insert(Box::from(path_key(&entry.name)), entry.clone());

        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf().into_boxed_path())
                .or_default()
                .insert(entry.name.clone().into_boxed_path());
        }
    }

    fn remove_children(&mut self, path_name: &Path) {
        if let Some(children) = self.children.remove(path_name) {
            for child in children {
                self.remove_entry(&child);
            }
        }
    }

    fn remove_entry(&mut self, path_name: &Path) {
        if let Some(entry) = self.entries.remove(path_key(path_name)) {
            for parent in entry.parent_dirs() {
                if let Some(children) = self.children.get_mut(parent) {
                    children.remove(path_name);
                    if children.is_empty() {
                        self.children.remove(parent);
                    }
                }
            }
        }
    }

    /// Stage an entry, replacing the entry at the same path
    ///
    /// A file replaces any entries below a directory of the same name and a
    /// nested file replaces a file standing where one of its parents would be.
    pub fn add(&mut self, entry: IndexEntry) {
        self.discard_conflicts(&entry);
        self.store_entry(&entry);

        self.changed = true;
    }

    /// Unstage `path`, or everything below it when it names a directory
    pub fn remove(&mut self, path: &Path) -> Result<()> {
        if !self.is_directly_tracked(path) {
            return Err(Error::user_input(format!(
                "pathspec '{}' did not match any staged files",
                path.display()
            )));
        }

        self.remove_entry(path);
        self.remove_children(path);

        self.changed = true;

        Ok(())
    }

    /// Serialize the header, the path-sorted entries and the trailing checksum
    fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let mut writer = Checksum::new(Vec::new());

        let header = IndexHeader::for_entries(self.entries.len())?;
        writer.write(&header.serialize()?)?;

        for entry in self.entries() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        Ok(writer.into_inner())
    }

    /// Persist the index atomically
    pub fn write_updates(&mut self) -> Result<()> {
        let content = self
            .encode()
            .kind_context(ErrorKind::FileSystem, || "unable to encode the index")?;

        lockfile::write_atomically(&self.path, &content)
            .kind_context(ErrorKind::FileSystem, || "unable to write the index")?;

        tracing::info!(entries = self.entries.len(), "wrote index");
        self.changed = false;

        Ok(())
    }

    /// Entries in byte order of their paths, the order they are written in
    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    /// Tracked paths equal to or below `path`
    pub fn entries_under_path(&self, path: &Path) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter(|entry| entry.name.starts_with(path))
            .map(|entry| entry.name.clone())
            .collect()
    }
}

/// Index order compares paths byte by byte, not component by component
fn path_key(path: &Path) -> &[u8] {
    path.as_os_str().as_encoded_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::index_entry::EntryMetadata;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::objects::object_id::ObjectId;
    use crate::artifacts::objects::object_type::ObjectType;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn index_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn index_in(dir: &TempDir) -> Index {
        Index::new(dir.path().join("index").into_boxed_path())
    }

    fn entry(name: &str) -> IndexEntry {
        IndexEntry::new(
            PathBuf::from(name),
            ObjectId::hash(ObjectType::Blob, name.as_bytes()).unwrap(),
            EntryMetadata {
                mtime: 1_700_000_000,
                size: name.len() as u64,
                mode: EntryMode::File(FileMode::Regular),
                ..Default::default()
            },
        )
    }

    fn names(index: &Index) -> Vec<String> {
        index
            .entries()
            .map(|entry| entry.name.display().to_string())
            .collect()
    }

    #[rstest]
    fn missing_index_reads_as_empty(index_dir: TempDir) {
        let mut index = index_in(&index_dir);

        index.rehydrate().unwrap();

        assert!(index.is_empty());
    }

    #[rstest]
    fn written_index_reads_back_in_path_order(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("b.txt"));
        index.add(entry("a/nested.txt"));
        index.add(entry("a.txt"));
        index.write_updates().unwrap();

        let mut reloaded = index_in(&index_dir);
        reloaded.rehydrate().unwrap();

        assert_eq!(names(&reloaded), vec!["a.txt", "a/nested.txt", "b.txt"]);
        assert!(!reloaded.is_changed());
    }

    #[rstest]
    fn entries_sort_by_path_bytes(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("a/b"));
        index.add(entry("a-b"));
        index.add(entry("a.b"));
        index.add(entry("a0"));

        assert_eq!(names(&index), vec!["a-b", "a.b", "a/b", "a0"]);
    }

    #[rstest]
    fn file_replaces_directory_and_vice_versa(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("alice.txt"));
        index.add(entry("nested/bob.txt"));
        index.add(entry("nested/inner/claire.txt"));

        index.add(entry("nested"));
        assert_eq!(names(&index), vec!["alice.txt", "nested"]);

        index.add(entry("alice.txt/nested.txt"));
        assert_eq!(names(&index), vec!["alice.txt/nested.txt", "nested"]);
    }

    #[rstest]
    fn removing_a_directory_unstages_its_children(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("a/1.txt"));
        index.add(entry("a/b/2.txt"));
        index.add(entry("c.txt"));

        index.remove(Path::new("a")).unwrap();

        assert_eq!(names(&index), vec!["c.txt"]);
        assert!(!index.is_directly_tracked(Path::new("a/b")));
    }

    #[rstest]
    fn removing_an_unknown_path_is_rejected(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("a.txt"));

        let err = index.remove(Path::new("b.txt")).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UserInput);
        assert_eq!(index.len(), 1);
    }

    #[rstest]
    fn truncated_index_is_a_file_system_error(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("a.txt"));
        index.write_updates().unwrap();
        let data = std::fs::read(index.path()).unwrap();
        std::fs::write(index.path(), &data[..data.len() - 7]).unwrap();

        let mut reloaded = index_in(&index_dir);
        reloaded.add(entry("kept.txt"));
        let err = reloaded.rehydrate().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileSystem);
        assert_eq!(names(&reloaded), vec!["kept.txt"]);
    }

    #[rstest]
    #[case(0, b'X')]
    #[case(7, 3)]
    #[case(20, 0xff)]
    fn tampered_index_is_rejected(index_dir: TempDir, #[case] offset: usize, #[case] byte: u8) {
        let mut index = index_in(&index_dir);
        index.add(entry("a.txt"));
        index.write_updates().unwrap();
        let mut data = std::fs::read(index.path()).unwrap();
        data[offset] = byte;
        std::fs::write(index.path(), &data).unwrap();

        let err = index_in(&index_dir).rehydrate().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }

    #[rstest]
    fn cleared_index_persists_as_empty(index_dir: TempDir) {
        let mut index = index_in(&index_dir);
        index.add(entry("a.txt"));
        index.write_updates().unwrap();

        index.clear();
        index.write_updates().unwrap();
        let mut reloaded = index_in(&index_dir);
        reloaded.rehydrate().unwrap();

        assert!(reloaded.is_empty());
    }

    proptest! {
        #[test]
        fn index_round_trips(names in proptest::collection::btree_set("[a-z]{1,12}(/[a-z]{1,12}){0,2}\\.txt", 0..16)) {
            let dir = TempDir::new().unwrap();
            let mut index = index_in(&dir);
            for name in &names {
                index.add(entry(name));
            }
            index.write_updates().unwrap();

            let mut reloaded = index_in(&dir);
            reloaded.rehydrate().unwrap();

            let written = index.entries().map(|e| (e.name.clone(), e.oid.clone(), e.metadata.clone())).collect::<Vec<_>>();
            let read = reloaded.entries().map(|e| (e.name.clone(), e.oid.clone(), e.metadata.clone())).collect::<Vec<_>>();
            prop_assert_eq!(written, read);
        }
    }
}
