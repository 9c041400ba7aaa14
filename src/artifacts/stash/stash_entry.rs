use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;

/// One line of the stash stack file: `<commit> <index tree>\t<message>`
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct StashEntry {
    /// Snapshot commit of the working tree; its parent is the commit stashed on
    pub commit: ObjectId,
    /// Tree of the index when the entry was saved
    pub index_tree: ObjectId,
    pub message: Option<String>,
}

impl StashEntry {
    pub fn to_line(&self) -> String {
        let message = self
            .message
            .as_deref()
            .map(|message| message.split_whitespace().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();

        format!("{} {}\t{}", self.commit, self.index_tree, message)
    }
}

impl TryFrom<&str> for StashEntry {
    type Error = anyhow::Error;

    fn try_from(line: &str) -> anyhow::Result<Self> {
        let (ids, message) = line.split_once('\t').context("missing message separator")?;
        let (commit, index_tree) = ids.split_once(' ').context("missing index tree id")?;

        Ok(StashEntry {
            commit: ObjectId::try_parse(commit.to_string())?,
            index_tree: ObjectId::try_parse(index_tree.to_string())?,
            message: Some(message.to_string()).filter(|message| !message.is_empty()),
        })
    }
}
