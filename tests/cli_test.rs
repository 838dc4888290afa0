use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_help_lists_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("academy"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--db-path"))
        .stdout(predicate::str::contains("--port"))
        .stdout(predicate::str::contains("--provider"));

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("academy"));
    cmd.arg("--port").arg("eighty");
    cmd.assert().failure();

    let mut cmd = Command::new(cargo_bin!("academy"));
    cmd.arg("--provider").arg("stripe");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("sandbox"));

    Ok(())
}
