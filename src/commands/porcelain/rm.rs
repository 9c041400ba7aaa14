use crate::areas::repository::Repository;
use crate::errors::{Error, Result};
use std::path::PathBuf;

impl Repository {
    /// Unstage paths; the working tree is left alone
    pub async fn remove(&self, paths: &[PathBuf]) -> Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = index.acquire_lock()?;

        index.rehydrate()?;

        let relative_paths = paths
            .iter()
            .map(|path| self.pathspec(path))
            .collect::<Result<Vec<_>>>()?;

        // nothing is removed unless every path is staged
        if let Some(unmatched) = relative_paths
            .iter()
            .find(|path| !index.is_directly_tracked(path))
        {
            return Err(Error::user_input(format!(
                "pathspec '{}' did not match any staged files",
                unmatched.display()
            )));
        }

        for path in &relative_paths {
            index.remove(path)?;
        }

        index.write_updates()?;

        Ok(())
    }
}
