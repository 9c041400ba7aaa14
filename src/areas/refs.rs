//! The HEAD reference
//!
//! HEAD names the commit the next commit will use as its parent.
//!
//! ## File Format
//!
//! `.git/HEAD` holds one of:
//! - nothing: the repository has no commits yet (unborn HEAD)
//! - a 40-character SHA-1 hash (direct reference)
//! - `ref: <path>` for a symbolic reference, resolved through `.git/<path>`
//!
//! Updates replace the file that finally holds the hash, under its lock file.

use crate::areas::lockfile::{self, Lockfile};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use derive_new::new;
use std::path::{Path, PathBuf};

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Where HEAD points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    /// No commit exists yet
    Unborn,
    Detached(ObjectId),
}

impl Head {
    pub fn oid(&self) -> Option<&ObjectId> {
        match self {
            Head::Unborn => None,
            Head::Detached(oid) => Some(oid),
        }
    }

    pub fn is_unborn(&self) -> bool {
        matches!(self, Head::Unborn)
    }
}

/// Reference manager rooted at the `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

impl Refs {
    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }

    /// Write an empty HEAD: the repository has no commits
    pub fn set_unborn(&self) -> Result<()> {
        self.write_ref(&self.head_path(), "")
    }

    pub fn read_head(&self) -> Result<Head> {
        let head_path = self.head_path();
        let content = std::fs::read_to_string(&head_path).map_err(|err| {
            Error::repository(format!("unable to read {}", head_path.display())).with_source(err)
        })?;

        match Self::symref_target(content.trim())? {
            Some(target) => {
                let target_path = self.path.join(target);
                match std::fs::read_to_string(&target_path) {
                    Ok(content) => Self::parse_oid(content.trim(), &target_path),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Head::Unborn),
                    Err(err) => Err(Error::repository(format!(
                        "unable to read {}",
                        target_path.display()
                    ))
                    .with_source(err)),
                }
            }
            None => Self::parse_oid(content.trim(), &head_path),
        }
    }

    /// Point HEAD (or the ref it names) at `oid`
    pub fn update_head(&self, oid: &ObjectId) -> Result<()> {
        let head_path = self.head_path();
        let content = match std::fs::read_to_string(&head_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(Error::repository(format!(
                    "unable to read {}",
                    head_path.display()
                ))
                .with_source(err));
            }
        };

        let target_path = match Self::symref_target(content.trim())? {
            Some(target) => self.path.join(target),
            None => head_path,
        };

        self.write_ref(&target_path, &format!("{oid}\n"))?;
        tracing::info!(oid = %oid, "moved HEAD");

        Ok(())
    }

    fn write_ref(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).kind_context(ErrorKind::FileSystem, || {
                format!("unable to create {}", parent.display())
            })?;
        }

        let _lock = Lockfile::for_path(path)
            .acquire()
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to lock {}", path.display())
            })?;

        lockfile::write_atomically(path, content.as_bytes()).kind_context(
            ErrorKind::FileSystem,
            || format!("unable to update {}", path.display()),
        )
    }

    fn symref_target(content: &str) -> Result<Option<String>> {
        let symref = regex::Regex::new(SYMREF_REGEX)
            .kind_context(ErrorKind::Repository, || "invalid symbolic ref pattern")?;

        Ok(symref
            .captures(content)
            .map(|captures| captures[1].trim().to_string()))
    }

    fn parse_oid(content: &str, path: &Path) -> Result<Head> {
        if content.is_empty() {
            return Ok(Head::Unborn);
        }

        ObjectId::try_parse(content.to_string())
            .map(Head::Detached)
            .kind_context(ErrorKind::Repository, || {
                format!("{} does not hold a valid object id", path.display())
            })
    }
}
