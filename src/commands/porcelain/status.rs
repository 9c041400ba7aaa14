use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::{Status, StatusInfo};
use crate::errors::Result;

// Terminology:
// - untracked files: present in the working tree but not in the index
// - staged changes: the index differs from the HEAD tree
// - unstaged changes: the working tree differs from the index
impl Repository {
    /// Compare HEAD, the index and the working tree without changing any of them
    pub async fn status(&self) -> Result<StatusInfo> {
        let index = self.index();
        let mut index = index.lock().await;
        index.rehydrate()?;

        Status::new(self).initialize(&index)
    }
}
