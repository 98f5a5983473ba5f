use assert_cmd::Command;
use predicates::prelude::*;

fn fixture() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ledger.csv")
}

#[test]
fn prints_the_reconciled_view_as_csv() {
    Command::cargo_bin("penalty-ledger")
        .unwrap()
        .arg(fixture())
        .args(["--customer-code", "NI038379"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "reference,classified,status,amount,outstanding,made_up_date,due_date,reason",
        ))
        .stdout(predicate::str::contains(
            "A1,penalty,open,150,150,2023-12-31,2024-02-10,Late filing of accounts",
        ))
        .stdout(predicate::str::contains("L1,other,closed"));
}

#[test]
fn company_code_selects_the_ledger_account() {
    Command::cargo_bin("penalty-ledger")
        .unwrap()
        .arg(fixture())
        .args(["--customer-code", "OC421444", "--company-code", "C1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "S9,penalty,open,300,300,2024-01-01,2024-03-01,Failure to file a confirmation statement",
        ));
}

#[test]
fn unknown_customer_yields_an_empty_view() {
    Command::cargo_bin("penalty-ledger")
        .unwrap()
        .arg(fixture())
        .args(["--customer-code", "ZZ000000"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("penalty-ledger")
        .unwrap()
        .arg("does-not-exist.csv")
        .args(["--customer-code", "NI038379"])
        .assert()
        .failure();
}
