//! Commit history
//!
//! - `rev_list`: lazy walk from a commit back to the root along parent links
//! - `revision`: revision expressions (`HEAD~2`, `@^`, abbreviated ids) and
//!   their resolution to a commit id

pub mod rev_list;
pub mod revision;

pub const PARENT_REGEX: &str = r"^(.+)\^$";
pub const ANCESTOR_REGEX: &str = r"^(.+)\~(\d+)$";

/// Shortest accepted abbreviation of an object id
pub const MIN_OID_PREFIX: usize = 4;

pub fn resolve_alias(name: &str) -> &str {
    match name {
        "@" => "HEAD",
        other => other,
    }
}
