use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::IndexEntry;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Reason a path blocks a working tree migration
///
/// Variants are ordered the way their reports are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictType {
    StaleFile,
    StaleDirectory,
    UntrackedOverwritten,
    UntrackedRemoved,
}

impl ConflictType {
    /// Tracked paths are always stale files; otherwise the blocker is whatever
    /// occupies the path on disk
    pub fn classify(
        is_directory: bool,
        entry: Option<&IndexEntry>,
        new_entry: Option<&DatabaseEntry>,
    ) -> ConflictType {
        match (entry, is_directory, new_entry) {
            (Some(_), _, _) => ConflictType::StaleFile,
            (None, true, _) => ConflictType::StaleDirectory,
            (None, false, Some(_)) => ConflictType::UntrackedOverwritten,
            (None, false, None) => ConflictType::UntrackedRemoved,
        }
    }

    fn summary(self) -> &'static str {
        match self {
            ConflictType::StaleFile => {
                "Your local changes to the following files would be overwritten:"
            }
            ConflictType::StaleDirectory => {
                "Updating the following directories would lose untracked files in them:"
            }
            ConflictType::UntrackedOverwritten => {
                "The following untracked working tree files would be overwritten:"
            }
            ConflictType::UntrackedRemoved => {
                "The following untracked working tree files would be removed:"
            }
        }
    }

    fn advice(self, action: &str) -> String {
        match self {
            ConflictType::StaleFile => {
                format!("Please commit your changes or reset them before {action}.")
            }
            _ => format!("Please move or remove them before {action}."),
        }
    }
}

/// One block of a refused migration report
pub struct ConflictReport<'a> {
    pub conflict_type: ConflictType,
    pub paths: &'a BTreeSet<PathBuf>,
    /// What was refused, e.g. "applying the stash"
    pub action: &'a str,
}

impl fmt::Display for ConflictReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.conflict_type.summary())?;
        for path in self.paths {
            writeln!(f, "\t{}", path.display())?;
        }
        write!(f, "{}", self.conflict_type.advice(self.action))
    }
}
