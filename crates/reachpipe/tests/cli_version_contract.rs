#[test]
fn reachpipe_version_contract() {
    let bin = assert_cmd::cargo::cargo_bin!("reachpipe");
    let out = std::process::Command::new(bin)
        .args(["version"])
        .output()
        .expect("run reachpipe version");

    assert!(out.status.success(), "reachpipe version failed");
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse version json");

    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["name"].as_str(), Some("reachpipe"));
    assert_eq!(v["version"].as_str(), Some(env!("CARGO_PKG_VERSION")));
}

#[test]
fn reachpipe_version_text_output() {
    use predicates::prelude::*;

    assert_cmd::Command::cargo_bin("reachpipe")
        .expect("binary built")
        .args(["version", "--output", "text"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("reachpipe "));
}

#[test]
fn unknown_subcommand_fails_with_usage() {
    use predicates::prelude::*;

    assert_cmd::Command::cargo_bin("reachpipe")
        .expect("binary built")
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
