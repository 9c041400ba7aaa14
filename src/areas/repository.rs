use crate::areas::database::{Database, ObjectStore, ObjectStoreExt};
use crate::areas::index::Index;
use crate::areas::refs::{Head, Refs};
use crate::areas::stash::StashStack;
use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::diff::tree_diff::FlatTree;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::config::Config;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const GIT_DIR: &str = ".git";
const OBJECTS_DIR: &str = "objects";
const INDEX_FILE: &str = "index";
const STASH_FILE: &str = "stash";

pub struct Repository {
    path: Box<Path>,
    git_path: Box<Path>,
    index: Arc<Mutex<Index>>,
    database: Box<dyn ObjectStore>,
    workspace: Workspace,
    refs: Refs,
    stash: StashStack,
    config: Config,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Repository rooted at `path` backed by the on-disk object database
    ///
    /// `path` must exist; nothing under `.git` is checked or created.
    pub fn new(path: &Path, config: Config) -> Result<Self> {
        let path = Self::canonical_root(path)?;
        let database = Database::new(path.join(GIT_DIR).join(OBJECTS_DIR).into_boxed_path());

        Ok(Self::assemble(path, Box::new(database), config))
    }

    /// Repository rooted at `path` using the given object store
    pub fn with_database(
        path: &Path,
        config: Config,
        database: Box<dyn ObjectStore>,
    ) -> Result<Self> {
        let path = Self::canonical_root(path)?;

        Ok(Self::assemble(path, database, config))
    }

    /// Open the repository at `path`, which must hold a `.git` directory
    pub fn open(path: &Path, config: Config) -> Result<Self> {
        if !path.join(GIT_DIR).is_dir() {
            return Err(Error::repository(format!(
                "not a repository: {} has no {GIT_DIR} directory",
                path.display()
            )));
        }

        Self::new(path, config)
    }

    /// Open the closest repository containing `start`
    pub fn discover(start: &Path, config: Config) -> Result<Self> {
        let root = start
            .ancestors()
            .find(|dir| dir.join(GIT_DIR).is_dir())
            .ok_or_else(|| {
                Error::repository(format!(
                    "not a repository (or any of the parent directories): {}",
                    start.display()
                ))
            })?;

        Self::new(root, config)
    }

    fn canonical_root(path: &Path) -> Result<PathBuf> {
        path.canonicalize().kind_context(ErrorKind::FileSystem, || {
            format!("unable to resolve {}", path.display())
        })
    }

    fn assemble(path: PathBuf, database: Box<dyn ObjectStore>, config: Config) -> Self {
        let git_path = path.join(GIT_DIR);

        Repository {
            index: Arc::new(Mutex::new(Index::new(
                git_path.join(INDEX_FILE).into_boxed_path(),
            ))),
            workspace: Workspace::new(path.clone().into_boxed_path()),
            refs: Refs::new(git_path.clone().into_boxed_path()),
            stash: StashStack::new(git_path.join(STASH_FILE).into_boxed_path()),
            path: path.into_boxed_path(),
            git_path: git_path.into_boxed_path(),
            database,
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    pub fn index(&self) -> Arc<Mutex<Index>> {
        self.index.clone()
    }

    pub fn database(&self) -> &dyn ObjectStore {
        self.database.as_ref()
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn stash(&self) -> &StashStack {
        &self.stash
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store raw content as an object of `object_type`
    pub fn store_object(&self, content: &[u8], object_type: ObjectType) -> Result<ObjectId> {
        self.database
            .store(content, object_type)
            .kind_context(ErrorKind::Repository, || {
                format!("unable to store {object_type} object")
            })
    }

    /// Type and content of a stored object
    pub fn get_object(&self, object_id: &ObjectId) -> Result<(ObjectType, Bytes)> {
        self.database
            .load(object_id)
            .kind_context(ErrorKind::Repository, || {
                format!("unable to read object {object_id}")
            })
    }

    pub fn get_head(&self) -> Result<Head> {
        self.refs.read_head()
    }

    /// Point HEAD at a stored commit; the index and working tree are untouched
    pub fn set_head(&self, object_id: &ObjectId) -> Result<()> {
        self.load_commit(object_id)?;
        self.refs.update_head(object_id)
    }

    pub fn load_commit(&self, object_id: &ObjectId) -> Result<Commit> {
        self.database
            .load_commit(object_id)
            .kind_context(ErrorKind::Repository, || {
                format!("{object_id} is not a stored commit")
            })
    }

    /// HEAD's commit, `None` while HEAD is unborn
    pub fn head_commit(&self) -> Result<Option<(ObjectId, Commit)>> {
        match self.get_head()? {
            Head::Unborn => Ok(None),
            Head::Detached(oid) => {
                let commit = self.load_commit(&oid)?;
                Ok(Some((oid, commit)))
            }
        }
    }

    /// Every file of HEAD's tree; empty while HEAD is unborn
    pub fn head_tree(&self) -> Result<FlatTree> {
        match self.head_commit()? {
            Some((_, commit)) => self.load_tree_entries(commit.tree_oid()),
            None => Ok(FlatTree::new()),
        }
    }

    /// Every file reachable from the tree `tree_oid`, keyed by its full path
    pub fn load_tree_entries(&self, tree_oid: &ObjectId) -> Result<FlatTree> {
        let mut entries = FlatTree::new();
        self.collect_tree_entries(tree_oid, Path::new(""), &mut entries)?;

        Ok(entries)
    }

    fn collect_tree_entries(
        &self,
        tree_oid: &ObjectId,
        prefix: &Path,
        entries: &mut FlatTree,
    ) -> Result<()> {
        let tree = self
            .database
            .load_tree(tree_oid)
            .kind_context(ErrorKind::Repository, || {
                format!("unable to load tree {tree_oid}")
            })?;

        for (name, entry) in tree.entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.collect_tree_entries(&entry.oid, &path, entries)?;
            } else {
                entries.insert(path, entry.clone());
            }
        }

        Ok(())
    }

    /// Store the tree (and every subtree) described by `entries` and return the root id
    pub fn write_tree<'e>(&self, entries: impl IntoIterator<Item = &'e IndexEntry>) -> Result<ObjectId> {
        let tree = Tree::build(entries)
            .kind_context(ErrorKind::Repository, || "unable to build tree from the index")?;

        let mut store = |content: Bytes| -> anyhow::Result<ObjectId> {
            Ok(self.database.store(&content, ObjectType::Tree)?)
        };

        tree.write_to(&mut store)
            .kind_context(ErrorKind::Repository, || "unable to store tree")
    }

    /// Store the tree described by a flat path map
    pub fn write_flat_tree(&self, entries: &FlatTree) -> Result<ObjectId> {
        let entries = entries
            .iter()
            .map(|(path, entry)| Self::index_entry_for(path, entry))
            .collect::<Vec<_>>();

        self.write_tree(entries.iter())
    }

    /// Index entry restored from a tree entry, without stat data
    pub(crate) fn index_entry_for(path: &Path, entry: &DatabaseEntry) -> IndexEntry {
        IndexEntry::new(
            path.to_path_buf(),
            entry.oid.clone(),
            EntryMetadata::unknown(entry.mode),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn root() -> TempDir {
        TempDir::new().unwrap()
    }

    fn repository(root: &TempDir) -> Repository {
        std::fs::create_dir_all(root.path().join(".git/objects")).unwrap();
        Repository::open(root.path(), Config::default()).unwrap()
    }

    fn blob_entry(repository: &Repository, content: &[u8]) -> DatabaseEntry {
        let oid = repository.store_object(content, ObjectType::Blob).unwrap();
        DatabaseEntry::new(oid, EntryMode::File(FileMode::Regular))
    }

    #[rstest]
    fn opening_without_git_dir_is_a_repository_error(root: TempDir) {
        let err = Repository::open(root.path(), Config::default()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Repository);
    }

    #[rstest]
    fn discovery_walks_up_to_the_repository_root(root: TempDir) {
        let expected = repository(&root).path().to_path_buf();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Repository::discover(&nested, Config::default()).unwrap();

        assert_eq!(found.path(), expected.as_path());
    }

    #[rstest]
    fn missing_objects_are_wrapped_as_repository_errors(root: TempDir) {
        let repository = repository(&root);
        let oid = ObjectId::hash(ObjectType::Blob, b"never stored").unwrap();

        let err = repository.get_object(&oid).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Repository);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[rstest]
    fn flat_trees_survive_a_round_trip(root: TempDir) {
        let repository = repository(&root);
        let flat = FlatTree::from([
            (PathBuf::from("a.txt"), blob_entry(&repository, b"a")),
            (PathBuf::from("dir/b.txt"), blob_entry(&repository, b"b")),
            (PathBuf::from("dir/sub/c.txt"), blob_entry(&repository, b"c")),
        ]);

        let tree_oid = repository.write_flat_tree(&flat).unwrap();

        assert_eq!(repository.load_tree_entries(&tree_oid).unwrap(), flat);
    }

    #[rstest]
    fn set_head_rejects_objects_that_are_not_commits(root: TempDir) {
        let repository = repository(&root);
        repository.refs().set_unborn().unwrap();
        let blob = repository.store_object(b"hi", ObjectType::Blob).unwrap();

        let err = repository.set_head(&blob).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Repository);
        assert_eq!(repository.get_head().unwrap(), Head::Unborn);
    }
}
