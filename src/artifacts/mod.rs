//! Data structures and algorithms behind the areas and commands
//!
//! - `checkout`: Working tree migration and conflict detection
//! - `database`: Tree entry types
//! - `diff`: Flat tree comparison
//! - `index`: Index file codec
//! - `log`: History walking and revision parsing
//! - `objects`: Object types (blob, tree, commit)
//! - `stash`: Stash stack entries
//! - `status`: Working tree status inspection

pub mod checkout;
pub mod database;
pub mod diff;
pub mod index;
pub mod log;
pub mod objects;
pub mod stash;
pub mod status;
