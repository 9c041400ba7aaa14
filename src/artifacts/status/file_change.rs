use colored::Colorize;

const LABEL_WIDTH: usize = 8;

/// Working tree compared against the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WorkspaceChangeType {
    #[default]
    None,
    Untracked,
    Modified,
    Deleted,
}

impl From<&WorkspaceChangeType> for &str {
    fn from(change: &WorkspaceChangeType) -> Self {
        match change {
            WorkspaceChangeType::None => " ",
            WorkspaceChangeType::Untracked => "?",
            WorkspaceChangeType::Modified => "M",
            WorkspaceChangeType::Deleted => "D",
        }
    }
}

/// Index compared against the HEAD tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum IndexChangeType {
    #[default]
    None,
    Added,
    Modified,
    Deleted,
}

impl From<&IndexChangeType> for &str {
    fn from(change: &IndexChangeType) -> Self {
        match change {
            IndexChangeType::None => " ",
            IndexChangeType::Added => "A",
            IndexChangeType::Modified => "M",
            IndexChangeType::Deleted => "D",
        }
    }
}

/// A path's overall state, collapsed from its two comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileState {
    Untracked,
    StagedNew,
    StagedModified,
    StagedDeleted,
    ModifiedUnstaged,
    Unmodified,
}

impl FileState {
    pub fn as_str(&self) -> &str {
        match self {
            FileState::Untracked => "untracked",
            FileState::StagedNew => "staged-new",
            FileState::StagedModified => "staged-modified",
            FileState::StagedDeleted => "staged-deleted",
            FileState::ModifiedUnstaged => "modified-unstaged",
            FileState::Unmodified => "unmodified",
        }
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Section label of the long status format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileChangeType {
    Workspace(WorkspaceChangeType),
    Index(IndexChangeType),
}

impl std::fmt::Display for FileChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let colored_str = match self {
            FileChangeType::Workspace(workspace_change) => match workspace_change {
                WorkspaceChangeType::None | WorkspaceChangeType::Untracked => "".normal(),
                WorkspaceChangeType::Modified => "modified:   ".red(),
                WorkspaceChangeType::Deleted => "deleted:    ".red(),
            },
            FileChangeType::Index(index_change) => match index_change {
                IndexChangeType::None => "".normal(),
                IndexChangeType::Added => "new file:   ".green(),
                IndexChangeType::Modified => "modified:   ".green(),
                IndexChangeType::Deleted => "deleted:    ".green(),
            },
        };
        write!(f, "{:>width$}{}", "", colored_str, width = LABEL_WIDTH)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileChange {
    pub index_change: IndexChangeType,
    pub workspace_change: WorkspaceChangeType,
}

impl FileChange {
    /// Untracked wins over staged changes, which win over unstaged ones
    pub fn state(&self) -> FileState {
        match (self.index_change, self.workspace_change) {
            (_, WorkspaceChangeType::Untracked) => FileState::Untracked,
            (IndexChangeType::Added, _) => FileState::StagedNew,
            (IndexChangeType::Modified, _) => FileState::StagedModified,
            (IndexChangeType::Deleted, _) => FileState::StagedDeleted,
            (IndexChangeType::None, WorkspaceChangeType::None) => FileState::Unmodified,
            (IndexChangeType::None, _) => FileState::ModifiedUnstaged,
        }
    }

    pub fn is_unmodified(&self) -> bool {
        self.state() == FileState::Unmodified
    }
}

/// Two-letter porcelain code: index column then working tree column
impl From<&FileChange> for String {
    fn from(change: &FileChange) -> Self {
        match (change.index_change, change.workspace_change) {
            (IndexChangeType::None, WorkspaceChangeType::Untracked) => "??".to_string(),
            (index_change, WorkspaceChangeType::Untracked) => {
                let index_str: &str = (&index_change).into();
                format!("{index_str} ")
            }
            (index_change, workspace_change) => {
                let index_str: &str = (&index_change).into();
                let workspace_str: &str = (&workspace_change).into();
                format!("{index_str}{workspace_str}")
            }
        }
    }
}

impl std::fmt::Display for FileChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let change_str: String = self.into();
        write!(f, "{}", change_str)
    }
}
