//! Core repository components
//!
//! This module contains the fundamental building blocks of a repository:
//!
//! - `database`: Object database for storing blobs, trees, and commits
//! - `index`: Staging area (index/cache) for tracking file changes
//! - `lockfile`: Cross-process lock files and atomic file replacement
//! - `refs`: The HEAD pointer
//! - `repository`: High-level repository operations and coordination
//! - `stash`: The stash stack file
//! - `workspace`: Working directory file system operations

pub mod database;
pub mod index;
pub mod lockfile;
pub mod refs;
pub mod repository;
pub mod stash;
pub mod workspace;
