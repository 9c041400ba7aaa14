//! gitclone: a local, single-repository version-control engine
//!
//! The crate is split the same way the command line is:
//!
//! - `areas`: on-disk state (object database, index, HEAD, stash stack, working tree)
//! - `artifacts`: data structures and algorithms operating on that state
//! - `commands`: repository operations, one file per command
//! - `config` and `errors`: ambient configuration and the shared error type
//!
//! Nothing in the library prints; every operation returns a value that the
//! `gitclone` binary renders.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;

pub use errors::{Error, ErrorKind, Result};
