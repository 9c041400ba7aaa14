use crate::common::command::{
    bit_commit, bit_stdout, commit_all, init_repository_dir, repository_dir, run_bit_command,
};
use crate::common::file::{FileSpec, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use rstest::rstest;

mod common;

// printf 'hi' | git hash-object --stdin
const HI_BLOB: &str = "32f95c0d1244a78b2be1bab8de17906fabb2c4a8";

#[rstest]
fn first_commit_is_a_root_commit(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    write_file(FileSpec::new(
        repository_dir.path().join("a.txt"),
        "hi".to_string(),
    ));
    run_bit_command(repository_dir.path(), &["add", "a.txt"])
        .assert()
        .success();

    bit_commit(repository_dir.path(), "first")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\[\(root-commit\) [0-9a-f]{7}\] first\n$").unwrap());

    let head = common::read_head(repository_dir.path()).expect("HEAD should be set");
    let commit = bit_stdout(repository_dir.path(), &["cat-file", "-p", &head]);
    let tree_oid = commit
        .lines()
        .next()
        .and_then(|line| line.strip_prefix("tree "))
        .expect("commit should start with its tree");
    let tree = bit_stdout(repository_dir.path(), &["cat-file", "-p", tree_oid]);

    assert_eq!(tree, format!("100644 blob {HI_BLOB}\ta.txt"));
    assert!(!commit.contains("parent "));
}

#[rstest]
fn write_commit_object_successfully_for_nested_project(init_repository_dir: TempDir) {
    let first = common::read_head(init_repository_dir.path()).expect("HEAD should be set");

    write_file(FileSpec::new(
        init_repository_dir.path().join("a").join("b").join("4.txt"),
        "four".to_string(),
    ));
    let second = commit_all(init_repository_dir.path(), "Second commit");

    assert_ne!(first, second);
    let commit = bit_stdout(init_repository_dir.path(), &["cat-file", "-p", &second]);
    assert!(commit.contains(&format!("parent {first}")));

    let status = bit_stdout(init_repository_dir.path(), &["status", "--porcelain"]);
    assert_eq!(status, "");
}

#[rstest]
fn commit_with_an_empty_message_fails(init_repository_dir: TempDir) {
    let head = common::read_head(init_repository_dir.path());

    bit_commit(init_repository_dir.path(), "   ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty commit message"));

    assert_eq!(common::read_head(init_repository_dir.path()), head);
}

#[rstest]
fn commit_with_an_empty_index_fails(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    bit_commit(repository_dir.path(), "nothing")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to commit"));

    assert_eq!(common::read_head(repository_dir.path()), None);
}

#[rstest]
fn commit_without_an_author_fails(init_repository_dir: TempDir) {
    let head = common::read_head(init_repository_dir.path());

    run_bit_command(init_repository_dir.path(), &["commit", "-m", "anonymous"])
        .env_remove("GIT_AUTHOR_NAME")
        .env_remove("GIT_AUTHOR_EMAIL")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GIT_AUTHOR_NAME"));

    assert_eq!(common::read_head(init_repository_dir.path()), head);
}
