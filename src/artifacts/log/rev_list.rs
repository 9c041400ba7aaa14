use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{Error, Result};
use std::collections::HashSet;

/// First-parent history walk, newest first
///
/// Yields at most `limit` commits. A commit that cannot be loaded, or an id
/// seen twice, is reported once as an error and ends the walk.
pub struct RevList<'r> {
    repository: &'r Repository,
    next_oid: Option<ObjectId>,
    remaining: Option<usize>,
    visited: HashSet<ObjectId>,
}

impl<'r> RevList<'r> {
    pub fn new(repository: &'r Repository, start: Option<ObjectId>, limit: Option<usize>) -> Self {
        RevList {
            repository,
            next_oid: start,
            remaining: limit,
            visited: HashSet::new(),
        }
    }

    fn finish(&mut self) {
        self.next_oid = None;
    }
}

impl Iterator for RevList<'_> {
    type Item = Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == Some(0) {
            self.finish();
            return None;
        }

        let commit_oid = self.next_oid.take()?;

        if !self.visited.insert(commit_oid.clone()) {
            return Some(Err(Error::repository(format!(
                "history revisits commit {commit_oid}"
            ))));
        }

        match self.repository.load_commit(&commit_oid) {
            Ok(commit) => {
                self.next_oid = commit.parent().cloned();
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }

                Some(Ok((commit_oid, commit)))
            }
            Err(err) => {
                self.finish();
                Some(Err(err))
            }
        }
    }
}
