//! Operations exposed on [`Repository`](crate::areas::repository::Repository)
//!
//! `plumbing` reads and writes raw objects (hash-object, cat-file). `porcelain`
//! holds the history workflows built on top: staging, committing, status,
//! log, reset and the stash stack.

pub mod plumbing;
pub mod porcelain;
