use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

impl Repository {
    /// Stage files, expanding directories
    ///
    /// A tracked path missing from the working tree has its removal staged.
    pub async fn add(&self, paths: &[PathBuf]) -> Result<()> {
        let index = self.index();
        let mut index = index.lock().await;
        let _lock = index.acquire_lock()?;

        // Load the index file from the disk
        index.rehydrate()?;

        let mut files = BTreeSet::new();
        let mut removed = BTreeSet::new();

        for path in paths {
            let relative = self.pathspec(path)?;
            let absolute = self.workspace().path().join(&relative);

            if !absolute.exists() {
                if !index.is_directly_tracked(&relative) {
                    return Err(Error::file_system(format!(
                        "pathspec '{}' did not match any files",
                        path.display()
                    )));
                }
                removed.insert(relative);
                continue;
            }

            let listed = self
                .workspace()
                .list_files(Some(&absolute))
                .kind_context(ErrorKind::FileSystem, || {
                    format!("unable to list {}", path.display())
                })?;

            // tracked files that disappeared from an added directory
            for tracked in index.entries_under_path(&relative) {
                if !listed.contains(&tracked) {
                    removed.insert(tracked);
                }
            }
            files.extend(listed);
        }

        for path in &removed {
            if index.is_directly_tracked(path) {
                index.remove(path)?;
            }
        }

        for path in &files {
            self.stage_file(&mut index, path)?;
        }

        index.write_updates()?;

        Ok(())
    }

    fn stage_file(&self, index: &mut Index, path: &Path) -> Result<()> {
        let data = self
            .workspace()
            .read_file(path)
            .kind_context(ErrorKind::FileSystem, || {
                format!("open('{}'): unable to read file", path.display())
            })?;
        let stat = self
            .workspace()
            .stat_file(path)
            .kind_context(ErrorKind::FileSystem, || {
                format!("unable to stat {}", path.display())
            })?;

        let blob_id = self.store_object(&data, ObjectType::Blob)?;
        index.add(IndexEntry::new(path.to_path_buf(), blob_id, stat));

        Ok(())
    }

    /// Express a command-line path relative to the repository root
    pub(crate) fn pathspec(&self, path: &Path) -> Result<PathBuf> {
        self.workspace()
            .relative_path(path)
            .kind_context(ErrorKind::UserInput, || {
                format!("'{}' is outside repository", path.display())
            })
    }
}
