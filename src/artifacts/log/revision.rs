use crate::areas::database::ObjectStoreExt;
use crate::areas::refs::{HEAD_REF_NAME, Head};
use crate::areas::repository::Repository;
use crate::artifacts::log::{ANCESTOR_REGEX, MIN_OID_PREFIX, PARENT_REGEX, resolve_alias};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{Error, ErrorContext, ErrorKind, Result};

/// A parsed revision expression
///
/// ```ignore
/// let rev = Revision::try_parse("HEAD~2")?;
/// let oid = rev.resolve(&repository)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    Head,
    /// Full or abbreviated object id
    Oid(String),
    Parent(Box<Revision>),
    Ancestor(Box<Revision>, usize),
}

impl Revision {
    pub fn try_parse(revision: &str) -> Result<Revision> {
        let parent = regex::Regex::new(PARENT_REGEX)
            .kind_context(ErrorKind::UserInput, || "invalid parent pattern")?;
        let ancestor = regex::Regex::new(ANCESTOR_REGEX)
            .kind_context(ErrorKind::UserInput, || "invalid ancestor pattern")?;

        if let Some(caps) = parent.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            return Ok(Revision::Parent(Box::new(base_revision)));
        }

        if let Some(caps) = ancestor.captures(revision) {
            let generations = caps[2].parse::<usize>().kind_context(ErrorKind::UserInput, || {
                format!("invalid generation count in revision '{revision}'")
            })?;
            let base_revision = Self::try_parse(&caps[1])?;
            return Ok(Revision::Ancestor(Box::new(base_revision), generations));
        }

        match resolve_alias(revision) {
            HEAD_REF_NAME => Ok(Revision::Head),
            name if Self::looks_like_oid(name) => Ok(Revision::Oid(name.to_ascii_lowercase())),
            _ => Err(Self::unknown(revision)),
        }
    }

    /// Commit id named by this revision
    pub fn resolve(&self, repository: &Repository) -> Result<ObjectId> {
        match self {
            Revision::Head => match repository.get_head()? {
                Head::Detached(oid) => Ok(oid),
                Head::Unborn => Err(Error::user_input(
                    "HEAD does not point to a commit yet",
                )),
            },
            Revision::Oid(name) => Self::resolve_oid(name, repository),
            Revision::Parent(base_revision) => {
                Self::resolve_commit_parent(&base_revision.resolve(repository)?, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(&oid, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_commit_parent(oid: &ObjectId, repository: &Repository) -> Result<ObjectId> {
        let commit = repository.load_commit(oid)?;

        commit.parent().cloned().ok_or_else(|| {
            Error::user_input(format!("commit {} has no parent", oid.to_short_oid()))
        })
    }

    fn resolve_oid(name: &str, repository: &Repository) -> Result<ObjectId> {
        let candidates = if name.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(name.to_string())
                .kind_context(ErrorKind::UserInput, || format!("invalid object id {name}"))?;
            if repository.database().exists(&oid) {
                vec![oid]
            } else {
                Vec::new()
            }
        } else {
            repository
                .database()
                .find_by_prefix(name)
                .kind_context(ErrorKind::UserInput, || {
                    format!("unable to resolve '{name}'")
                })?
        };

        let commits = candidates
            .iter()
            .filter(|oid| {
                repository
                    .database()
                    .object_type(oid)
                    .is_ok_and(|object_type| object_type == ObjectType::Commit)
            })
            .collect::<Vec<_>>();

        match (candidates.len(), commits.as_slice()) {
            (0, _) => Err(Self::unknown(name)),
            (_, [oid]) => Ok((*oid).clone()),
            (1, []) => {
                let object_type = repository.database().object_type(&candidates[0])?;
                Err(Error::user_input(format!(
                    "object {} is a {object_type}, not a commit",
                    candidates[0].to_short_oid()
                )))
            }
            (_, []) => Err(Self::unknown(name)),
            (_, commits) => {
                let mut message = format!("short SHA1 {name} is ambiguous\nhint: The candidates are:");
                for oid in commits {
                    message.push_str(&format!("\nhint:   {} commit", oid.to_short_oid()));
                }
                Err(Error::user_input(message))
            }
        }
    }

    fn looks_like_oid(name: &str) -> bool {
        (MIN_OID_PREFIX..=OBJECT_ID_LENGTH).contains(&name.len())
            && name.chars().all(|c| c.is_ascii_hexdigit())
    }

    fn unknown(revision: &str) -> Error {
        Error::user_input(format!(
            "ambiguous argument '{revision}': unknown revision or path not in the working tree"
        ))
    }
}
