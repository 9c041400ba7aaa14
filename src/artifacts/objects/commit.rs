//! Commit object
//!
//! Commits are immutable history nodes. They contain:
//! - A tree object ID (directory snapshot)
//! - At most one parent commit ID (absent for the root commit)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object::{Object, Packable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::io::BufRead;

/// Author or committer information
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create a new author stamped with the current local time
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// "Name <email> timestamp timezone", as serialized in commits
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

/// `name <email> seconds ±hhmm`; the name may contain spaces
const AUTHOR_REGEX: &str = r"^(?<name>[^<]*?)\s*<(?<email>[^>]*)>\s+(?<seconds>-?\d+)\s+(?<offset>[+-]\d{4})$";

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let captures = regex::Regex::new(AUTHOR_REGEX)
            .with_context(|| format!("invalid author regex: {AUTHOR_REGEX}"))?
            .captures(value)
            .with_context(|| format!("malformed identity line: {value:?}"))?;

        let stamp = format!("{} {}", &captures["seconds"], &captures["offset"]);
        let timestamp = chrono::DateTime::parse_from_str(&stamp, "%s %z")
            .with_context(|| format!("malformed identity timestamp: {stamp}"))?;

        Ok(Author {
            name: captures["name"].to_string(),
            email: captures["email"].to_string(),
            timestamp,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    parent: Option<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    /// Create a new commit; the author is also recorded as committer
    pub fn new(parent: Option<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parent,
            tree_oid,
            author: author.clone(),
            committer: author,
            message,
        }
    }

    /// First line of the commit message
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parent.as_ref()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.author.timestamp()
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        Ok(Bytes::from(self.display()))
    }
}

impl Unpackable for Commit {
    /// Headers must come in order: `tree`, at most one `parent`, `author`, `committer`
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let (headers, message) = content
            .split_once("\n\n")
            .context("commit object has no message")?;

        let mut tree_oid = None;
        let mut parent = None;
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let (key, value) = line
                .split_once(' ')
                .with_context(|| format!("malformed commit header: {line:?}"))?;

            match (key, &tree_oid, &parent, &author, &committer) {
                ("tree", None, _, _, _) => {
                    tree_oid = Some(ObjectId::try_parse(value.to_string())?);
                }
                ("parent", Some(_), None, None, _) => {
                    parent = Some(ObjectId::try_parse(value.to_string())?);
                }
                ("parent", Some(_), Some(_), None, _) => {
                    anyhow::bail!("commits with more than one parent are not supported");
                }
                ("author", Some(_), _, None, _) => author = Some(Author::try_from(value)?),
                ("committer", _, _, Some(_), None) => {
                    committer = Some(Author::try_from(value)?);
                }
                _ => anyhow::bail!("unexpected commit header: {key}"),
            }
        }

        Ok(Commit {
            parent,
            tree_oid: tree_oid.context("commit object has no tree")?,
            author: author.context("commit object has no author")?,
            committer: committer.context("commit object has no committer")?,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        let parent = self
            .parent
            .as_ref()
            .map(|parent| format!("parent {parent}\n"))
            .unwrap_or_default();

        format!(
            "tree {}\n{parent}author {}\ncommitter {}\n\n{}",
            self.tree_oid,
            self.author.display(),
            self.committer.display(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn author() -> Author {
        Author::try_from("Ada Lovelace <ada@example.com> 1700000000 +0100").unwrap()
    }

    #[fixture]
    fn tree_oid() -> ObjectId {
        ObjectId::hash(ObjectType::Tree, b"").unwrap()
    }

    #[rstest]
    fn author_line_is_reversible(author: Author) {
        assert_eq!(
            author.display(),
            "Ada Lovelace <ada@example.com> 1700000000 +0100"
        );
        assert_eq!(author.display_name(), "Ada Lovelace <ada@example.com>");
        assert_eq!(author.readable_timestamp(), "Tue Nov 14 23:13:20 2023 +0100");
    }

    #[rstest]
    #[case("no email 1700000000 +0000")]
    #[case("Ada <ada@example.com> yesterday +0000")]
    #[case("Ada")]
    fn malformed_author_lines_are_rejected(#[case] line: &str) {
        assert!(Author::try_from(line).is_err());
    }

    #[rstest]
    fn root_commit_has_no_parent_line(author: Author, tree_oid: ObjectId) {
        let commit = Commit::new(None, tree_oid.clone(), author, "first".to_string());

        let payload = String::from_utf8(commit.serialize().unwrap().to_vec()).unwrap();

        assert_eq!(
            payload,
            format!(
                "tree {tree_oid}\nauthor Ada Lovelace <ada@example.com> 1700000000 +0100\n\
                 committer Ada Lovelace <ada@example.com> 1700000000 +0100\n\nfirst"
            )
        );
    }

    #[rstest]
    fn commit_payload_parses_back(author: Author, tree_oid: ObjectId) {
        let parent = ObjectId::hash(ObjectType::Commit, b"parent").unwrap();
        let commit = Commit::new(
            Some(parent),
            tree_oid,
            author,
            "subject\n\nbody line".to_string(),
        );

        let parsed = Commit::deserialize(std::io::Cursor::new(commit.serialize().unwrap())).unwrap();

        assert_eq!(parsed, commit);
        assert_eq!(parsed.short_message(), "subject");
        assert_eq!(parsed.object_id().unwrap(), commit.object_id().unwrap());
    }

    #[rstest]
    fn merge_commits_are_rejected(author: Author, tree_oid: ObjectId) {
        let parent = ObjectId::hash(ObjectType::Commit, b"p").unwrap();
        let payload = format!(
            "tree {tree_oid}\nparent {parent}\nparent {parent}\nauthor {a}\ncommitter {a}\n\nmerge",
            a = author.display()
        );

        assert!(Commit::deserialize(std::io::Cursor::new(payload.into_bytes())).is_err());
    }
}
