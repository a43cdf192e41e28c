
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_it_rewrites_a_collection() {
    let d = tempdir().unwrap();
    let input = d.path().join("collection.xml");
    fs::copy(collection_sample(), &input).unwrap();
    let output = d.path().join("output.xml");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &input.to_string_lossy(),
        "--out",
        &output.to_string_lossy(),
        "--no-confirm",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Finished: 2 tracks changed, 2 cues added"));

    let rewritten = fs::read_to_string(&output).unwrap();
    assert!(rewritten.contains("Start=\"62.012\" Num=\"-1\""));
    assert!(rewritten.contains("Start=\"15.250\" Num=\"-1\""));
}

#[test]
fn test_a_line_on_stdin_continues_past_the_prompt() {
    let d = tempdir().unwrap();
    let input = d.path().join("collection.xml");
    fs::copy(collection_sample(), &input).unwrap();
    let output = d.path().join("output.xml");

    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &input.to_string_lossy(),
        "--out",
        &output.to_string_lossy(),
    ]);
    cmd.write_stdin("\n");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Press enter to continue"));

    assert!(output.exists(), "Expected the rewrite to run after the prompt");
}

#[test]
fn test_missing_input_exits_1() {
    let d = tempdir().unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &d.path().join("nope.xml").to_string_lossy(),
        "--out",
        &d.path().join("output.xml").to_string_lossy(),
        "--no-confirm",
    ]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_uncreatable_output_exits_2() {
    let d = tempdir().unwrap();
    let input = d.path().join("collection.xml");
    fs::copy(collection_sample(), &input).unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &input.to_string_lossy(),
        "--out",
        &d.path().join("no-such-dir").join("output.xml").to_string_lossy(),
        "--no-confirm",
    ]);

    cmd.assert().failure().code(2);
}

#[test]
fn test_truncated_input_exits_10() {
    let d = tempdir().unwrap();
    let input = d.path().join("broken.xml");
    let mut f = File::create(&input).unwrap();
    f.write_all(b"<DJ_PLAYLISTS><COLLECTION ").unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &input.to_string_lossy(),
        "--out",
        &d.path().join("output.xml").to_string_lossy(),
        "--no-confirm",
    ]);

    cmd.assert().failure().code(10);
}

#[test]
fn test_rename_swaps_the_output_over_the_input() {
    let d = tempdir().unwrap();
    let input = d.path().join("collection.xml");
    fs::copy(collection_sample(), &input).unwrap();
    let output = d.path().join("output.xml");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.args([
        "--in",
        &input.to_string_lossy(),
        "--out",
        &output.to_string_lossy(),
        "--no-confirm",
        "--rename",
    ]);

    cmd.assert().success();

    let swapped = fs::read_to_string(&input).unwrap();
    assert!(
        swapped.contains("Start=\"62.012\" Num=\"-1\""),
        "Expected the input path to now hold the rewritten document"
    );

    let backup = fs::read_to_string(d.path().join("collection.xml.bak")).unwrap();
    assert_eq!(backup, fs::read_to_string(collection_sample()).unwrap());

    assert!(
        !output.exists(),
        "Expected the temporary output to have been moved over the input"
    );
}

// `dirs::home_dir` only honors $HOME on unix.
#[cfg(unix)]
#[test]
fn test_default_paths_resolve_under_home() {
    let home = tempdir().unwrap();
    let documents = home.path().join("Documents");
    fs::create_dir_all(&documents).unwrap();
    fs::copy(collection_sample(), documents.join("rekordbox.xml")).unwrap();

    let library = home.path().join("Library").join("Pioneer").join("rekordbox");
    fs::create_dir_all(&library).unwrap();

    let mut cmd = Command::new(assert_cmd::cargo_bin!("rekordcue_fix"));
    cmd.env("HOME", home.path());
    cmd.args(["--default", "--no-confirm"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Using standard rekordbox paths"));

    let rewritten = fs::read_to_string(library.join("rekordbox.xml")).unwrap();
    assert!(rewritten.contains("Start=\"62.012\" Num=\"-1\""));
}
