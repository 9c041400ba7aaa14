use crate::common::file::{FileSpec, write_file};
use assert_cmd::Command;
use assert_fs::TempDir;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "fake_user";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "2023-01-01 12:00:00 +0000"; // %Y-%m-%d %H:%M:%S %z

#[fixture]
pub fn repository_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Repository with `1.txt`, `a/2.txt` and `a/b/3.txt` committed once
#[fixture]
pub fn init_repository_dir(repository_dir: TempDir) -> TempDir {
    run_bit_command(repository_dir.path(), &["init"])
        .assert()
        .success();

    let file1 = FileSpec::new(repository_dir.path().join("1.txt"), "one".to_string());
    write_file(file1);

    let file2 = FileSpec::new(
        repository_dir.path().join("a").join("2.txt"),
        "two".to_string(),
    );
    write_file(file2);

    let file3 = FileSpec::new(
        repository_dir.path().join("a").join("b").join("3.txt"),
        "three".to_string(),
    );
    write_file(file3);

    run_bit_command(repository_dir.path(), &["add", "."])
        .assert()
        .success();

    bit_commit(repository_dir.path(), "Initial commit")
        .assert()
        .success();

    repository_dir
}

pub fn run_bit_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("gitclone").expect("Failed to find gitclone binary");
    cmd.env_remove("GITCLONE_LOG");
    cmd.env("NO_COLOR", "1");
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", AUTHOR_NAME),
        ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("GIT_AUTHOR_DATE", AUTHOR_DATE),
    ]);
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn bit_commit(dir: &Path, message: &str) -> Command {
    run_bit_command(dir, &["commit", "-m", message])
}

/// Stage everything and commit it, returning the new HEAD
pub fn commit_all(dir: &Path, message: &str) -> String {
    run_bit_command(dir, &["add", "."]).assert().success();
    bit_commit(dir, message).assert().success();

    crate::common::read_head(dir).expect("HEAD should point to a commit")
}

/// Standard output of a successful command
pub fn bit_stdout(dir: &Path, args: &[&str]) -> String {
    let output = run_bit_command(dir, args)
        .output()
        .expect("Failed to run gitclone");
    assert!(
        output.status.success(),
        "gitclone {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout).expect("stdout should be UTF-8")
}
