//! Environment-driven configuration
//!
//! The engine reads the same variables git uses for author identity. They are
//! captured once when the front end starts; library users and tests build a
//! [`Config`] directly instead of touching the process environment.

use crate::artifacts::objects::commit::Author;
use crate::errors::{Error, Result};

pub const AUTHOR_NAME_VAR: &str = "GIT_AUTHOR_NAME";
pub const AUTHOR_EMAIL_VAR: &str = "GIT_AUTHOR_EMAIL";
pub const AUTHOR_DATE_VAR: &str = "GIT_AUTHOR_DATE";

/// Variable holding the `tracing` filter used by the front end
pub const LOG_FILTER_VAR: &str = "GITCLONE_LOG";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    /// Raw `GIT_AUTHOR_DATE`; parsed when an identity is resolved
    pub author_date: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let non_empty = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());

        Config {
            author_name: non_empty(AUTHOR_NAME_VAR),
            author_email: non_empty(AUTHOR_EMAIL_VAR),
            author_date: non_empty(AUTHOR_DATE_VAR),
        }
    }

    pub fn with_author(name: impl Into<String>, email: impl Into<String>) -> Self {
        Config {
            author_name: Some(name.into()),
            author_email: Some(email.into()),
            author_date: None,
        }
    }

    /// Resolve the identity recorded on new commits
    ///
    /// Without a fixed `author_date` the current local time is used. A date
    /// that parses as neither RFC 2822 nor `%Y-%m-%d %H:%M:%S %z` is rejected.
    pub fn author(&self) -> Result<Author> {
        let (Some(name), Some(email)) = (&self.author_name, &self.author_email) else {
            return Err(Error::user_input(format!(
                "author identity unknown: set {AUTHOR_NAME_VAR} and {AUTHOR_EMAIL_VAR}"
            )));
        };

        let Some(date) = &self.author_date else {
            return Ok(Author::new(name.clone(), email.clone()));
        };
        let timestamp = parse_author_date(date).ok_or_else(|| {
            Error::user_input(format!("invalid {AUTHOR_DATE_VAR}: {date:?}"))
        })?;

        Ok(Author::new_with_timestamp(name.clone(), email.clone(), timestamp))
    }
}

fn parse_author_date(date: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc2822(date)
        .or_else(|_| chrono::DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
}
