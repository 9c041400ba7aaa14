use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::status::file_change::{IndexChangeType, WorkspaceChangeType};
use derive_new::new;

/// Compares one path across the HEAD tree, the index and the working tree
#[derive(new)]
pub struct Inspector<'w> {
    workspace: &'w Workspace,
}

impl<'w> Inspector<'w> {
    fn is_content_changed(&self, index_entry: &IndexEntry) -> anyhow::Result<bool> {
        let data = self.workspace.read_file(&index_entry.name)?;
        let oid = ObjectId::hash(ObjectType::Blob, &data)?;

        Ok(oid != index_entry.oid)
    }

    /// Stat data decides when size or mode differ, or when the timestamps
    /// still match; otherwise the file content is hashed
    pub fn check_index_against_workspace(
        &self,
        entry: Option<&IndexEntry>,
        stat: Option<&EntryMetadata>,
    ) -> anyhow::Result<WorkspaceChangeType> {
        match (entry, stat) {
            (None, None) => Ok(WorkspaceChangeType::None),
            (None, Some(_)) => Ok(WorkspaceChangeType::Untracked),
            (Some(_), None) => Ok(WorkspaceChangeType::Deleted),
            (Some(entry), Some(stat)) if !entry.stat_match(stat) => {
                Ok(WorkspaceChangeType::Modified)
            }
            (Some(entry), Some(stat)) if entry.times_match(stat) => Ok(WorkspaceChangeType::None),
            (Some(entry), Some(_)) if self.is_content_changed(entry)? => {
                Ok(WorkspaceChangeType::Modified)
            }
            _ => Ok(WorkspaceChangeType::None),
        }
    }

    pub fn check_index_against_head_tree(
        &self,
        index_entry: Option<&IndexEntry>,
        head_entry: Option<&DatabaseEntry>,
    ) -> IndexChangeType {
        match (index_entry, head_entry) {
            (Some(index_entry), Some(head_entry))
                if head_entry.mode != index_entry.metadata.mode
                    || head_entry.oid != index_entry.oid =>
            {
                IndexChangeType::Modified
            }
            (Some(_), None) => IndexChangeType::Added,
            (None, Some(_)) => IndexChangeType::Deleted,
            _ => IndexChangeType::None,
        }
    }
}
