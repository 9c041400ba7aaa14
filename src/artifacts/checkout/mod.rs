//! Moving the working tree and index between snapshots
//!
//! Used when a stash is applied: the changes recorded in the stash are
//! replayed only when none of the touched paths carries local changes.

pub mod conflict;
pub mod migration;
