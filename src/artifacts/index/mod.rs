//! On-disk layout of the staging index
//!
//! A 12 byte header (`DIRC`, version 2, entry count) is followed by the
//! entries sorted by path. Each entry is 62 bytes of stat data, object id and
//! flags plus its NUL-terminated path, padded to a multiple of 8. A SHA-1 of
//! everything before it closes the file.

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

pub const CHECKSUM_SIZE: usize = 20;
pub const HEADER_SIZE: usize = 12;
pub const SIGNATURE: &str = "DIRC";
pub const VERSION: u32 = 2;
