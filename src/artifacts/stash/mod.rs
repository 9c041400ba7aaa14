//! Stash stack entries
//!
//! A stash entry records the snapshot commit of the working tree, the tree of
//! the index at the time of saving, and the optional message it was saved with.

pub mod stash_entry;
