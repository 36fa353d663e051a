use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["op", "account", "to_account", "amount"])
        .unwrap();

    // Valid deposit
    wtr.write_record(["deposit", "ACC001", "", "1.0"]).unwrap();
    // Unknown operation
    wtr.write_record(["refund", "ACC001", "", "1.0"]).unwrap();
    // Transfer without a destination
    wtr.write_record(["transfer", "ACC001", "", "1.0"]).unwrap();
    // Text in amount field
    wtr.write_record(["deposit", "ACC001", "", "not_a_number"])
        .unwrap();
    // Valid deposit again
    wtr.write_record(["deposit", "ACC002", "", "2.0"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("ledgerflow"));
    cmd.arg(&output_path)
        .arg("--accounts")
        .arg("tests/fixtures/accounts.csv");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading operation"))
        .stderr(predicate::str::contains("has no to_account"))
        .stdout(predicate::str::contains(",DEPOSIT,1.0,"))
        .stdout(predicate::str::contains(",DEPOSIT,2.0,"));
}

#[test]
fn test_non_positive_amounts_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("amounts_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["op", "account", "to_account", "amount"])
        .unwrap();
    wtr.write_record(["deposit", "ACC001", "", "0"]).unwrap();
    wtr.write_record(["withdraw", "ACC001", "", "-5"]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("ledgerflow"));
    cmd.arg(&output_path)
        .arg("--accounts")
        .arg("tests/fixtures/accounts.csv");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Amount must be positive, got 0"))
        .stderr(predicate::str::contains("Amount must be positive, got -5"))
        .stdout(predicate::str::contains("TXN-").not());
}
