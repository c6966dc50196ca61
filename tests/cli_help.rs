use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn cli_help_runs() {
    let mut cmd = Command::cargo_bin("bagsync").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("play"))
        .stdout(contains("write-groundtruth"));
}

#[test]
fn play_help_lists_dataset_flags() {
    let mut cmd = Command::cargo_bin("bagsync").unwrap();
    cmd.args(["play", "--help"])
        .assert()
        .success()
        .stdout(contains("--dataset-dir"))
        .stdout(contains("--robot"))
        .stdout(contains("--rate"));
}
