use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub oneline: bool,
    pub limit: Option<usize>,
}

impl Repository {
    /// History from HEAD back to the root commit, at most `limit` entries
    ///
    /// An unborn HEAD gives an empty history.
    pub fn log(&self, limit: Option<usize>) -> Result<RevList<'_>> {
        let start = self.get_head()?.oid().cloned();

        Ok(RevList::new(self, start, limit))
    }

    pub fn display_commit(oid: &ObjectId, commit: &Commit, opts: &LogOptions) -> String {
        if opts.oneline {
            return format!("{} {}", oid.to_short_oid(), commit.short_message());
        }

        let mut lines = vec![
            format!("commit {oid}"),
            format!("Author: {}", commit.author().display_name()),
            format!("Date:   {}", commit.author().readable_timestamp()),
            String::new(),
        ];
        lines.extend(commit.message().lines().map(|line| format!("    {line}")));
        lines.push(String::new());

        lines.join("\n")
    }
}
