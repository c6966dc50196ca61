use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn version_is_semver_like() {
    let ver = env!("CARGO_PKG_VERSION");
    assert!(ver.split('.').count() >= 2);
}

#[test]
fn version_flag_prints_package_version() {
    let mut cmd = Command::cargo_bin("bagsync").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
