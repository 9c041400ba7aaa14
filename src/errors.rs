//! Error taxonomy shared by every layer of the engine
//!
//! Every failure carries a [`ErrorKind`], a human-readable message and an
//! optional wrapped cause. Lower layers (object codecs, file I/O) report their
//! own causes and the area that observed the failure decides which kind it is.

use thiserror::Error;

/// Boxed cause attached to an [`Error`]
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Category of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Uninitialized repository, unresolvable ref, corrupt history
    Repository,
    /// Store, retrieve or integrity failure in the object database
    Object,
    /// I/O failure on the working tree or on repository metadata
    FileSystem,
    /// Bad revision, out-of-range stash index, conflicting flags, nothing to do
    UserInput,
}

impl ErrorKind {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::Repository => "Repository Error",
            ErrorKind::Object => "Object Error",
            ErrorKind::FileSystem => "File System Error",
            ErrorKind::UserInput => "User Input Error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Cause>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn repository(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Repository, message)
    }

    pub fn object(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Object, message)
    }

    pub fn file_system(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    pub fn user_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserInput, message)
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Into<Cause>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Attach an [`ErrorKind`] and a message to any fallible result
///
/// This is the typed counterpart of `anyhow::Context`: the original error is
/// kept as the source of the returned [`Error`].
pub trait ErrorContext<T> {
    fn kind_context<M, F>(self, kind: ErrorKind, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Cause>,
{
    fn kind_context<M, F>(self, kind: ErrorKind, message: F) -> Result<T>
    where
        M: Into<String>,
        F: FnOnce() -> M,
    {
        self.map_err(|err| Error::new(kind, message()).with_source(err))
    }
}
