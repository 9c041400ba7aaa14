//! Tree entries as read back from the object store

pub mod database_entry;
