//! Object database
//!
//! Content-addressable storage for blobs, trees and commits. An object's
//! address is the SHA-1 of its tagged encoding `<type> <len>\0<content>`, so
//! the same content is only ever written once.
//!
//! ## Layout
//!
//! `.git/objects/<first 2 hex chars>/<remaining 38 hex chars>`, each file
//! holding the zlib-compressed tagged encoding.
//!
//! ## Durability
//!
//! Objects are written to a temp file in their fan-out directory, fsynced and
//! renamed into place: a reader never sees a partially written object, and
//! two writers racing on the same content converge on identical files.

use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{Object, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use bytes::Bytes;
use fake::rand;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Capability to persist and fetch objects by address
///
/// [`Database`] is the on-disk implementation; a repository is handed one at
/// construction time.
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    /// Store `content` as an object of `object_type` and return its address
    ///
    /// Storing content that is already present performs no write.
    fn store(&self, content: &[u8], object_type: ObjectType) -> Result<ObjectId>;

    /// Fetch an object's type and content, verifying its integrity
    fn load(&self, object_id: &ObjectId) -> Result<(ObjectType, Bytes)>;

    fn exists(&self, object_id: &ObjectId) -> bool;

    /// Every stored address starting with `prefix`
    fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>>;

    /// Fetch an object's content
    fn retrieve(&self, object_id: &ObjectId) -> Result<Bytes> {
        Ok(self.load(object_id)?.1)
    }
}

/// Typed helpers over any [`ObjectStore`]
pub trait ObjectStoreExt: ObjectStore {
    fn store_object(&self, object: &impl Object) -> Result<ObjectId> {
        let content = object
            .serialize()
            .kind_context(ErrorKind::Object, || {
                format!("unable to encode {} object", object.object_type())
            })?;

        self.store(&content, object.object_type())
    }

    fn object_type(&self, object_id: &ObjectId) -> Result<ObjectType> {
        Ok(self.load(object_id)?.0)
    }

    fn load_blob(&self, object_id: &ObjectId) -> Result<Blob> {
        let content = self.load_as(object_id, ObjectType::Blob)?;
        Ok(Blob::new(content))
    }

    fn load_tree(&self, object_id: &ObjectId) -> Result<Tree> {
        let content = self.load_as(object_id, ObjectType::Tree)?;

        Tree::deserialize(Cursor::new(content))
            .kind_context(ErrorKind::Object, || format!("corrupt tree {object_id}"))
    }

    fn load_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        let content = self.load_as(object_id, ObjectType::Commit)?;

        Commit::deserialize(Cursor::new(content))
            .kind_context(ErrorKind::Object, || format!("corrupt commit {object_id}"))
    }

    fn load_as(&self, object_id: &ObjectId, expected: ObjectType) -> Result<Bytes> {
        let (object_type, content) = self.load(object_id)?;

        if object_type != expected {
            return Err(Error::object(format!(
                "object {object_id} is a {object_type}, not a {expected}"
            )));
        }

        Ok(content)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    fn object_path(&self, object_id: &ObjectId) -> PathBuf {
        self.path.join(object_id.to_path())
    }

    fn write_object(&self, object_path: &Path, framed: &[u8]) -> anyhow::Result<()> {
        use anyhow::Context;

        let object_dir = object_path
            .parent()
            .with_context(|| format!("Invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir).with_context(|| {
            format!("Unable to create object directory {}", object_dir.display())
        })?;

        let temp_object_path = object_dir.join(Self::generate_temp_name());
        let object_content = Self::compress(framed)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .with_context(|| {
                format!("Unable to open object file {}", temp_object_path.display())
            })?;

        let written = file
            .write_all(&object_content)
            .and_then(|_| file.sync_all())
            .with_context(|| {
                format!("Unable to write object file {}", temp_object_path.display())
            })
            .and_then(|_| {
                // rename the temp file to the object file to make it atomic
                std::fs::rename(&temp_object_path, object_path).with_context(|| {
                    format!("Unable to rename object file to {}", object_path.display())
                })
            });

        if written.is_err() {
            let _ = std::fs::remove_file(&temp_object_path);
        }

        written
    }

    /// Decompress, validate the header and re-hash a stored object
    fn verify_object(object_id: &ObjectId, raw: &[u8]) -> anyhow::Result<(ObjectType, Bytes)> {
        let framed = Self::decompress(raw)?;

        let actual_id = ObjectId::hash_framed(&framed);
        if &actual_id != object_id {
            anyhow::bail!("content hashes to {actual_id}");
        }

        let mut reader = Cursor::new(framed.as_slice());
        let (object_type, size) = ObjectType::parse_header(&mut reader)?;
        let header_len = reader.position() as usize;

        let content = &framed[header_len..];
        if content.len() != size {
            anyhow::bail!(
                "declared length {size} does not match actual length {}",
                content.len()
            );
        }

        Ok((object_type, Bytes::copy_from_slice(content)))
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        use anyhow::Context;

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        use anyhow::Context;

        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content)
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }

    fn scan_fan_out_dir(
        &self,
        dir_name: &str,
        prefix: &str,
        matches: &mut Vec<ObjectId>,
    ) -> Result<()> {
        let dir_path = self.path.join(dir_name);
        if !dir_path.is_dir() {
            return Ok(());
        }

        let entries = std::fs::read_dir(&dir_path).kind_context(ErrorKind::Object, || {
            format!("unable to list {}", dir_path.display())
        })?;

        for entry in entries.filter_map(|entry| entry.ok()) {
            let file_name = entry.file_name();
            let full_oid = format!("{dir_name}{}", file_name.to_string_lossy());

            // temp files and anything else that is not an object id are skipped
            if full_oid.starts_with(prefix)
                && let Ok(oid) = ObjectId::try_parse(full_oid)
            {
                matches.push(oid);
            }
        }

        Ok(())
    }
}

impl ObjectStore for Database {
    fn store(&self, content: &[u8], object_type: ObjectType) -> Result<ObjectId> {
        let framed = object_type
            .frame(content)
            .kind_context(ErrorKind::Object, || "unable to encode object")?;
        let object_id = ObjectId::hash_framed(&framed);
        let object_path = self.object_path(&object_id);

        if object_path.exists() {
            tracing::debug!(oid = %object_id, %object_type, "object already stored");
            return Ok(object_id);
        }

        self.write_object(&object_path, &framed)
            .kind_context(ErrorKind::Object, || {
                format!("unable to store {object_type} {object_id}")
            })?;
        tracing::debug!(oid = %object_id, %object_type, size = content.len(), "stored object");

        Ok(object_id)
    }

    fn load(&self, object_id: &ObjectId) -> Result<(ObjectType, Bytes)> {
        let object_path = self.object_path(object_id);

        let raw = match std::fs::read(&object_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::object(format!("object {object_id} not found")));
            }
            Err(err) => {
                return Err(Error::object(format!("unable to read object {object_id}"))
                    .with_source(err));
            }
        };

        Self::verify_object(object_id, &raw).map_err(|err| {
            tracing::warn!(oid = %object_id, error = %err, "corrupt object");
            Error::object(format!("corrupt object {object_id}")).with_source(err)
        })
    }

    fn exists(&self, object_id: &ObjectId) -> bool {
        self.object_path(object_id).is_file()
    }

    fn find_by_prefix(&self, prefix: &str) -> Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();

        // a prefix of 2+ characters names its fan-out directory
        if prefix.len() >= 2 {
            self.scan_fan_out_dir(&prefix[..2], &prefix, &mut matches)?;
        } else {
            for i in 0..=255u8 {
                self.scan_fan_out_dir(&format!("{i:02x}"), &prefix, &mut matches)?;
            }
        }

        matches.sort();
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::database::database_entry::DatabaseEntry;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::objects::object::Packable;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn objects_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn database(dir: &TempDir) -> Database {
        Database::new(dir.path().join("objects").into_boxed_path())
    }

    fn stored_files(dir: &TempDir) -> usize {
        walkdir::WalkDir::new(dir.path())
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    #[rstest]
    fn storing_twice_writes_one_file(objects_dir: TempDir) {
        let database = database(&objects_dir);

        let first = database.store(b"hi", ObjectType::Blob).unwrap();
        let second = database.store(b"hi", ObjectType::Blob).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_ref(), "32f95c0d1244a78b2be1bab8de17906fabb2c4a8");
        assert_eq!(stored_files(&objects_dir), 1);
    }

    #[rstest]
    fn retrieve_returns_stored_content(objects_dir: TempDir) {
        let database = database(&objects_dir);

        let oid = database.store(b"some content", ObjectType::Blob).unwrap();

        assert!(database.exists(&oid));
        assert_eq!(database.retrieve(&oid).unwrap().to_vec(), b"some content");
        assert_eq!(database.object_type(&oid).unwrap(), ObjectType::Blob);
    }

    #[rstest]
    fn missing_object_is_an_object_error(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = ObjectId::hash(ObjectType::Blob, b"never stored").unwrap();

        let err = database.retrieve(&oid).unwrap_err();

        assert!(!database.exists(&oid));
        assert_eq!(err.kind(), ErrorKind::Object);
    }

    #[rstest]
    fn corrupted_object_is_detected(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = database.store(b"original", ObjectType::Blob).unwrap();
        let other = Database::compress(b"blob 8\0tampered").unwrap();
        std::fs::write(database.object_path(&oid), other).unwrap();

        let err = database.retrieve(&oid).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Object);
        assert!(err.message().contains("corrupt"));
    }

    #[rstest]
    fn garbage_bytes_are_detected(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = database.store(b"original", ObjectType::Blob).unwrap();
        std::fs::write(database.object_path(&oid), b"not zlib at all").unwrap();

        let err = database.retrieve(&oid).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Object);
    }

    #[rstest]
    fn typed_load_rejects_other_kinds(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = database.store_object(&Blob::new(Bytes::from("x"))).unwrap();

        let err = database.load_commit(&oid).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Object);
        assert!(err.message().contains("not a commit"));
    }

    #[rstest]
    fn trees_load_back(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let blob_oid = database.store(b"hi", ObjectType::Blob).unwrap();
        let mut payload = b"100644 a.txt\0".to_vec();
        blob_oid.write_h40_to(&mut payload).unwrap();
        let tree_oid = database.store(&payload, ObjectType::Tree).unwrap();

        let tree = database.load_tree(&tree_oid).unwrap();
        let entries = tree
            .entries()
            .map(|(name, entry)| (name.to_string(), entry.clone()))
            .collect::<Vec<_>>();

        assert_eq!(
            entries,
            vec![(
                "a.txt".to_string(),
                DatabaseEntry::new(blob_oid, EntryMode::File(FileMode::Regular))
            )]
        );
        assert_eq!(tree.serialize().unwrap().to_vec(), payload);
    }

    #[rstest]
    fn abbreviated_ids_are_resolved(objects_dir: TempDir) {
        let database = database(&objects_dir);
        let oid = database.store(b"hi", ObjectType::Blob).unwrap();
        database.store(b"other", ObjectType::Blob).unwrap();

        assert_eq!(database.find_by_prefix("32f9").unwrap(), vec![oid.clone()]);
        assert_eq!(database.find_by_prefix("3").unwrap().first(), Some(&oid));
        assert!(database.find_by_prefix("zz").unwrap().is_empty());
    }
}
