#![allow(dead_code)]

pub mod command;
pub mod file;

/// Object id stored in `.git/HEAD`, `None` while HEAD is unborn
pub fn read_head(dir: &std::path::Path) -> Option<String> {
    let content = std::fs::read_to_string(dir.join(".git").join("HEAD"))
        .unwrap_or_else(|e| panic!("Failed to read HEAD in {:?}: {}", dir, e));

    Some(content.trim().to_string()).filter(|oid| !oid.is_empty())
}

/// Path of the loose object file for `oid`
pub fn object_path(dir: &std::path::Path, oid: &str) -> std::path::PathBuf {
    dir.join(".git")
        .join("objects")
        .join(&oid[..2])
        .join(&oid[2..])
}
