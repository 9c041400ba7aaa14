//! Plumbing commands (low-level object access)
//!
//! ## Commands
//!
//! - `hash-object`: Compute a blob id and optionally store the blob
//! - `cat-file`: Print any stored object

pub mod cat_file;
pub mod hash_object;
