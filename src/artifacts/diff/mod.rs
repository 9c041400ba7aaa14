//! Tree comparison
//!
//! - `tree_diff`: file-level differences between two flattened trees, used to
//!   replay a stash and to plan working tree migrations
pub mod tree_diff;
