//! Index entry representation
//!
//! Each entry in the index represents a tracked file with:
//! - File path
//! - Content hash (object ID)
//! - File metadata (mode, size, timestamps)
//!
//! ## Entry Format
//!
//! Entries are stored in a binary format with 8-byte alignment for efficient reading.
//! Metadata includes both file status (mode, size) and timestamps (mtime, ctime)
//! which enable fast change detection without reading file content.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::cmp::min;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::{Path, PathBuf};

/// Maximum path length recorded in the entry flags
const MAX_PATH_SIZE: usize = 0xfff;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Minimum size of an index entry in bytes
pub const ENTRY_MIN_SIZE: usize = 64;

/// Number of 32-bit stat words leading each entry
const STAT_WORDS: usize = 10;

const STAT_SIZE: usize = STAT_WORDS * 4;

/// Stat words, object id and flags precede the path
const NAME_OFFSET: usize = STAT_SIZE + 20 + 2;

/// Index entry representing a tracked file
#[derive(Debug, Clone, new)]
pub struct IndexEntry {
    /// File path relative to repository root
    pub name: PathBuf,
    /// Blob ID of the staged content
    pub oid: ObjectId,
    /// File metadata (mode, size, timestamps)
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file name"))
    }

    /// Every ancestor directory of the entry, outermost first
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();

        dirs
    }

    pub fn mode(&self) -> EntryMode {
        self.metadata.mode
    }

    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name.cmp(&other.name)
    }
}

/// File metadata stored in index entries
///
/// Contains both file status information (mode, size, inode) and timestamps.
/// A size of zero means "unknown": such entries always fall back to a
/// content comparison when checked against the working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Change time (seconds since Unix epoch)
    pub ctime: i64,
    /// Change time nanoseconds
    pub ctime_nsec: i64,
    /// Modification time (seconds since Unix epoch)
    pub mtime: i64,
    /// Modification time nanoseconds
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    /// File size in bytes
    pub size: u64,
}

impl EntryMetadata {
    /// Metadata for an entry restored from a tree rather than read from disk
    pub fn unknown(mode: EntryMode) -> Self {
        EntryMetadata {
            mode,
            ..Default::default()
        }
    }

    /// Stat data for the file at `file_path` (an absolute path)
    pub fn from_stat(file_path: &Path, metadata: &Metadata) -> Self {
        let mode = if metadata.is_dir() {
            EntryMode::Directory
        } else if file_path.is_executable() {
            EntryMode::File(FileMode::Executable)
        } else {
            EntryMode::File(FileMode::Regular)
        };

        Self {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
        }
    }
}

impl EntryMetadata {
    /// The stat words in on-disk order; wider fields are truncated to 32 bits
    fn to_words(&self) -> [u32; STAT_WORDS] {
        [
            self.ctime as u32,
            self.ctime_nsec as u32,
            self.mtime as u32,
            self.mtime_nsec as u32,
            self.dev as u32,
            self.ino as u32,
            self.mode.as_u32(),
            self.uid,
            self.gid,
            self.size as u32,
        ]
    }

    fn from_words(words: [u32; STAT_WORDS]) -> anyhow::Result<Self> {
        let [ctime, ctime_nsec, mtime, mtime_nsec, dev, ino, mode, uid, gid, size] = words;

        Ok(EntryMetadata {
            ctime: ctime.into(),
            ctime_nsec: ctime_nsec.into(),
            mtime: mtime.into(),
            mtime_nsec: mtime_nsec.into(),
            dev: dev.into(),
            ino: ino.into(),
            mode: EntryMode::try_from(mode)?,
            uid,
            gid,
            size: size.into(),
        })
    }
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let name = self
            .name
            .to_str()
            .with_context(|| format!("path {} is not valid UTF-8", self.name.display()))?;
        let flags = min(name.len(), MAX_PATH_SIZE) as u16;

        let mut out = Vec::with_capacity(ENTRY_MIN_SIZE + name.len());
        for word in self.metadata.to_words() {
            out.write_u32::<NetworkEndian>(word)?;
        }
        self.oid.write_h40_to(&mut out)?;
        out.write_u16::<NetworkEndian>(flags)?;
        out.write_all(name.as_bytes())?;

        // NUL-terminate, then pad to the block size
        let padded = (out.len() / ENTRY_BLOCK + 1) * ENTRY_BLOCK;
        out.resize(padded, 0);

        Ok(Bytes::from(out))
    }
}

impl Unpackable for IndexEntry {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        anyhow::ensure!(
            bytes.len() >= ENTRY_MIN_SIZE && bytes.len() % ENTRY_BLOCK == 0,
            "index entry of {} bytes is not block aligned",
            bytes.len()
        );

        let mut words = [0u32; STAT_WORDS];
        NetworkEndian::read_u32_into(&bytes[..STAT_SIZE], &mut words);
        let metadata = EntryMetadata::from_words(words)?;

        let oid = ObjectId::read_h40_from(&mut &bytes[STAT_SIZE..STAT_SIZE + 20])?;

        let name = &bytes[NAME_OFFSET..];
        let name_len = name
            .iter()
            .position(|&b| b == 0)
            .context("entry name is not NUL-terminated")?;
        anyhow::ensure!(name_len > 0, "entry name is empty");
        let name = std::str::from_utf8(&name[..name_len]).context("entry name is not UTF-8")?;

        Ok(IndexEntry {
            name: PathBuf::from(name),
            oid,
            metadata,
        })
    }
}
