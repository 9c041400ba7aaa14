//! Tree object
//!
//! Trees represent directory snapshots. They contain entries for files (blobs)
//! and subdirectories (other trees), along with their names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Entries are kept in canonical order: directories sort as if their name
//! ended with `/`, which is why directory keys carry a trailing slash.
//!
//! ## Tree Building
//!
//! A tree is built from the path-sorted index as a trie: every entry is
//! pushed down its chain of parent directories, creating intermediate trees as
//! needed. Writing walks the trie bottom-up so each subtree is encoded and
//! stored exactly once.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone)]
enum TreeEntry {
    /// Reference to a stored blob or subtree
    Stored(DatabaseEntry),
    /// Subtree still being built from the index
    Directory(Tree),
}

impl TreeEntry {
    fn object_type(&self) -> ObjectType {
        match self {
            TreeEntry::Stored(entry) if !entry.is_tree() => ObjectType::Blob,
            _ => ObjectType::Tree,
        }
    }

    fn mode(&self) -> EntryMode {
        match self {
            TreeEntry::Stored(entry) => entry.mode,
            TreeEntry::Directory(_) => EntryMode::Directory,
        }
    }

    fn oid(&self) -> anyhow::Result<ObjectId> {
        match self {
            TreeEntry::Stored(entry) => Ok(entry.oid.clone()),
            TreeEntry::Directory(tree) => tree.object_id(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Build a tree from index entries
    ///
    /// Files are organized into directories matching their path structure.
    pub fn build<'e>(entries: impl IntoIterator<Item = &'e IndexEntry>) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let parents = entry.parent_dirs();
            root.add_entry(&parents, entry)?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, parents: &[&Path], entry: &IndexEntry) -> anyhow::Result<()> {
        let Some((parent, rest)) = parents.split_first() else {
            self.entries.insert(
                entry.basename()?.to_string(),
                TreeEntry::Stored(DatabaseEntry::new(entry.oid.clone(), entry.mode())),
            );
            return Ok(());
        };

        let parent = parent
            .file_name()
            .and_then(|s| s.to_str())
            .context("Invalid parent")?;
        let key = format!("{parent}/");

        let slot = self
            .entries
            .entry(key)
            .or_insert_with(|| TreeEntry::Directory(Tree::default()));
        if matches!(slot, TreeEntry::Stored(_)) {
            *slot = TreeEntry::Directory(Tree::default());
        }

        match slot {
            TreeEntry::Directory(tree) => tree.add_entry(rest, entry),
            TreeEntry::Stored(_) => unreachable!(),
        }
    }

    /// Store every subtree bottom-up and return the root tree ID
    ///
    /// `store` receives each tree payload exactly once, children before parents.
    pub fn write_to<F>(&self, store: &mut F) -> anyhow::Result<ObjectId>
    where
        F: FnMut(Bytes) -> anyhow::Result<ObjectId>,
    {
        let mut resolved = Vec::with_capacity(self.entries.len());

        for (name, entry) in &self.entries {
            let oid = match entry {
                TreeEntry::Stored(entry) => entry.oid.clone(),
                TreeEntry::Directory(tree) => tree.write_to(store)?,
            };
            resolved.push((name.as_str(), entry.mode(), oid));
        }

        store(Self::encode(resolved)?)
    }

    fn encode<'n>(
        entries: impl IntoIterator<Item = (&'n str, EntryMode, ObjectId)>,
    ) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, mode, oid) in entries {
            let name = name.trim_end_matches('/');
            write!(content, "{} {}", mode.as_str(), name)?;
            content.push(0);
            oid.write_h40_to(&mut content)?;
        }

        Ok(Bytes::from(content))
    }

    /// Entries of a tree loaded from the database, in canonical order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &DatabaseEntry)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            TreeEntry::Stored(entry) => Some((name.trim_end_matches('/'), entry)),
            TreeEntry::Directory(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let entries = self
            .entries
            .iter()
            .map(|(name, entry)| Ok((name.as_str(), entry.mode(), entry.oid()?)))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Self::encode(entries)
    }
}

impl Unpackable for Tree {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut entries = BTreeMap::new();

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                return Err(anyhow::anyhow!("unexpected EOF in mode"));
            }

            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') || name_bytes.is_empty() {
                return Err(anyhow::anyhow!("unexpected EOF in name"));
            }
            let name = std::str::from_utf8(&name_bytes)?.to_owned();

            let oid =
                ObjectId::read_h40_from(&mut reader).context("unexpected EOF in object id")?;

            let key = if mode.is_tree() { format!("{name}/") } else { name };
            entries.insert(key, TreeEntry::Stored(DatabaseEntry::new(oid, mode)));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, tree_entry)| {
                format!(
                    "{} {} {}\t{}",
                    tree_entry.mode(),
                    tree_entry.object_type(),
                    tree_entry.oid().unwrap_or_default(),
                    name.trim_end_matches('/')
                )
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}
