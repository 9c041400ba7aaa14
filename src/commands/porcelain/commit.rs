use crate::areas::database::ObjectStoreExt;
use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub oid: ObjectId,
    /// Whether the commit has no parent
    pub root: bool,
    /// First line of the message
    pub summary: String,
}

impl std::fmt::Display for CommitReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let is_root = if self.root { "(root-commit) " } else { "" };
        write!(f, "[{}{}] {}", is_root, self.oid.to_short_oid(), self.summary)
    }
}

impl Repository {
    /// Record the index as a new commit on top of HEAD
    ///
    /// The index is left as it is.
    pub async fn commit(&self, message: &str) -> Result<CommitReceipt> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::user_input(
                "aborting commit due to empty commit message",
            ));
        }

        let index = self.index();
        let mut index = index.lock().await;

        // Load the index file from the disk
        index.rehydrate()?;

        if index.is_empty() {
            return Err(Error::user_input("nothing to commit (the index is empty)"));
        }

        let author = self.config().author()?;
        let tree_id = self.write_tree(index.entries())?;
        let parent = self.get_head()?.oid().cloned();
        let root = parent.is_none();

        let commit = Commit::new(parent, tree_id, author, message.to_string());
        let commit_id = self
            .database()
            .store_object(&commit)
            .kind_context(ErrorKind::Repository, || "unable to store commit")?;
        self.refs().update_head(&commit_id)?;

        tracing::info!(oid = %commit_id, root, "created commit");

        Ok(CommitReceipt {
            oid: commit_id,
            root,
            summary: commit.short_message(),
        })
    }
}
