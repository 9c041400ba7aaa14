use crate::common::command::{bit_stdout, init_repository_dir, repository_dir, run_bit_command};
use crate::common::file::{FileSpec, read_file, write_file};
use assert_fs::TempDir;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;

#[rstest]
fn save_reverts_to_head_and_apply_restores(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let head = common::read_head(dir).expect("HEAD should be set");
    write_file(FileSpec::new(dir.join("1.txt"), "one, modified".to_string()));

    run_bit_command(dir, &["stash", "save"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "WIP on {}: Initial commit",
            &head[..7]
        )));

    assert_eq!(read_file(&dir.join("1.txt")), "one");
    assert_eq!(bit_stdout(dir, &["status", "--porcelain"]), "");
    assert_eq!(common::read_head(dir), Some(head.clone()));

    let list = bit_stdout(dir, &["stash", "list"]);
    assert_eq!(list, format!("stash@{{0}}: WIP on {}: Initial commit\n", &head[..7]));

    run_bit_command(dir, &["stash", "apply"]).assert().success();

    assert_eq!(read_file(&dir.join("1.txt")), "one, modified");
    assert_eq!(bit_stdout(dir, &["status", "--porcelain"]), " M 1.txt\n");
    // apply keeps the entry
    assert_eq!(bit_stdout(dir, &["stash", "list"]).lines().count(), 1);
}

#[rstest]
fn staged_changes_come_back_staged(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, staged".to_string()));
    write_file(FileSpec::new(dir.join("new.txt"), "new".to_string()));
    run_bit_command(dir, &["add", "1.txt", "new.txt"]).assert().success();
    std::fs::remove_file(dir.join("a").join("2.txt")).expect("Failed to delete file");

    run_bit_command(dir, &["stash", "save", "-m", "wip"])
        .assert()
        .success();

    assert!(!dir.join("new.txt").exists());
    assert_eq!(read_file(&dir.join("a").join("2.txt")), "two");
    assert_eq!(bit_stdout(dir, &["status", "--porcelain"]), "");

    run_bit_command(dir, &["stash", "apply", "0"]).assert().success();

    assert_eq!(read_file(&dir.join("new.txt")), "new");
    assert!(!dir.join("a").join("2.txt").exists());
    assert_eq!(
        bit_stdout(dir, &["status", "--porcelain"]),
        "M  1.txt\n D a/2.txt\nA  new.txt\n"
    );
}

#[rstest]
fn messages_are_recorded_most_recent_first(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    let head = common::read_head(dir).expect("HEAD should be set");

    write_file(FileSpec::new(dir.join("1.txt"), "first change".to_string()));
    run_bit_command(dir, &["stash", "save", "-m", "first"])
        .assert()
        .success();
    write_file(FileSpec::new(dir.join("1.txt"), "second change".to_string()));
    run_bit_command(dir, &["stash", "save", "-m", "second"])
        .assert()
        .success();

    let short = &head[..7];
    assert_eq!(
        bit_stdout(dir, &["stash", "list"]),
        format!("stash@{{0}}: On {short}: second\nstash@{{1}}: On {short}: first\n")
    );

    run_bit_command(dir, &["stash", "apply", "1"]).assert().success();
    assert_eq!(read_file(&dir.join("1.txt")), "first change");
}

#[rstest]
fn untracked_files_are_left_alone(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, modified".to_string()));
    write_file(FileSpec::new(dir.join("scratch.txt"), "scratch".to_string()));

    run_bit_command(dir, &["stash", "save"]).assert().success();

    assert_eq!(read_file(&dir.join("scratch.txt")), "scratch");
    assert_eq!(bit_stdout(dir, &["status", "--porcelain"]), "?? scratch.txt\n");
}

#[rstest]
fn save_without_changes_fails(init_repository_dir: TempDir) {
    run_bit_command(init_repository_dir.path(), &["stash", "save"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no local changes to save"));

    assert_eq!(bit_stdout(init_repository_dir.path(), &["stash", "list"]), "");
}

#[rstest]
fn save_before_the_first_commit_fails(repository_dir: TempDir) {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();
    write_file(FileSpec::new(repository_dir.path().join("a.txt"), "a".to_string()));
    run_bit_command(repository_dir.path(), &["add", "a.txt"])
        .assert()
        .success();

    run_bit_command(repository_dir.path(), &["stash", "save"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User Input Error"));

    assert_eq!(
        bit_stdout(repository_dir.path(), &["status", "--porcelain"]),
        "A  a.txt\n"
    );
}

#[rstest]
fn apply_refuses_to_overwrite_local_changes(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "stashed".to_string()));
    run_bit_command(dir, &["stash", "save"]).assert().success();
    write_file(FileSpec::new(dir.join("1.txt"), "local edit, longer".to_string()));

    run_bit_command(dir, &["stash", "apply"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Your local changes"))
        .stderr(predicate::str::contains("1.txt"));

    assert_eq!(read_file(&dir.join("1.txt")), "local edit, longer");
}

#[rstest]
#[case(&["stash", "apply", "3"])]
#[case(&["stash", "drop", "1"])]
fn out_of_range_positions_fail(init_repository_dir: TempDir, #[case] args: &[&str]) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, modified".to_string()));
    run_bit_command(dir, &["stash", "save"]).assert().success();

    run_bit_command(dir, args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("stash@{"));

    assert_eq!(bit_stdout(dir, &["stash", "list"]).lines().count(), 1);
}

#[rstest]
fn drop_removes_the_entry(init_repository_dir: TempDir) {
    let dir = init_repository_dir.path();
    write_file(FileSpec::new(dir.join("1.txt"), "one, modified".to_string()));
    run_bit_command(dir, &["stash", "save"]).assert().success();

    run_bit_command(dir, &["stash", "drop"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Dropped stash@{0}"));

    assert_eq!(bit_stdout(dir, &["stash", "list"]), "");
}
