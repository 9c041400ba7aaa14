//! Porcelain commands (user-facing operations)
//!
//! Each command is an `impl Repository` block. Commands return values and
//! leave rendering to the front end.
//!
//! ## Commands
//!
//! - `init`: Create a repository
//! - `add` / `rm`: Stage and unstage files
//! - `commit`: Record the index as a new commit
//! - `status`: Compare HEAD, the index and the working tree
//! - `log`: Walk the first-parent history
//! - `reset`: Move HEAD in soft, mixed or hard mode
//! - `stash`: Save, apply, list and drop working tree snapshots

pub mod add;
pub mod commit;
pub mod init;
pub mod log;
pub mod reset;
pub mod rm;
pub mod stash;
pub mod status;
