//! Working tree status inspection
//!
//! Every path is compared twice: the index against the HEAD tree, and the
//! working tree against the index.
//!
//! ## Components
//!
//! - `file_change`: change kinds and the collapsed per-path state
//! - `inspector`: the two comparisons for a single path
//! - `status_info`: status of the whole repository and its renderings

pub mod file_change;
pub mod inspector;
pub mod status_info;
