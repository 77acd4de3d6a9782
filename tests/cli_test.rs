use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg("tests/fixtures/commands.csv")
        .env_remove("WALLET_DATABASE_URL");

    cmd.assert()
        .success()
        .stdout(predicate::str::diff(
            "owner,wallet,balance\n\
             alice,checking,69.5\n\
             alice,savings,20\n\
             bob,main,2\n",
        ));

    Ok(())
}

#[test]
fn test_cli_missing_input_fails() {
    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg("tests/fixtures/does_not_exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_cli_rejects_unknown_flag() {
    let mut cmd = Command::new(cargo_bin!("wallet-ledger"));
    cmd.arg("tests/fixtures/commands.csv")
        .arg("--history-limit")
        .arg("50");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--history-limit"));
}
