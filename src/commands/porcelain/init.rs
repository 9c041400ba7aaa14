use crate::areas::repository::{GIT_DIR, Repository};
use crate::config::Config;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use std::fs;
use std::path::Path;

impl Repository {
    /// Create an empty repository at `path`, creating the directory if needed
    ///
    /// The repository starts with an empty object database, an empty index and
    /// an unborn HEAD.
    pub async fn init(path: &Path, config: Config) -> Result<Repository> {
        let git_path = path.join(GIT_DIR);
        if git_path.join("HEAD").exists() || git_path.join("objects").is_dir() {
            return Err(Error::repository(format!(
                "repository already initialized in {}",
                git_path.display()
            )));
        }

        fs::create_dir_all(path).kind_context(ErrorKind::FileSystem, || {
            format!("failed to create {}", path.display())
        })?;

        let repository = Repository::new(path, config)?;

        fs::create_dir_all(repository.git_path().join("objects"))
            .kind_context(ErrorKind::FileSystem, || {
                "failed to create .git/objects directory"
            })?;

        {
            let index = repository.index();
            let mut index = index.lock().await;
            let _lock = index.acquire_lock()?;
            index.clear();
            index.write_updates()?;
        }

        repository.refs().set_unborn()?;

        tracing::info!(path = %repository.path().display(), "initialized repository");
        Ok(repository)
    }
}
