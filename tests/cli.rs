use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;

fn moni(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("moni").expect("binary exists");
    cmd.env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("OPENAI_API_KEY");
    cmd
}

fn initialized_home() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    moni(home.path())
        .args(["init", "--data-dir"])
        .arg(&data)
        .assert()
        .success()
        .stdout(contains("Initialized moni"));
    home
}

#[test]
fn help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    moni(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("categories"))
        .stdout(contains("import"));
}

#[test]
fn init_creates_database_and_statements_folder() {
    let home = initialized_home();
    let data = home.path().join("data");
    assert!(data.join("moni.db").exists());
    assert!(data.join("statements").is_dir());
    assert!(home.path().join(".config/moni/settings.json").exists());
}

#[test]
fn init_seeds_default_categories() {
    let home = initialized_home();
    moni(home.path())
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(contains("Groceries"))
        .stdout(contains("Salary"));
}

#[test]
fn categories_add_then_list() {
    let home = initialized_home();
    moni(home.path())
        .args(["categories", "add", "Coffee"])
        .assert()
        .success()
        .stdout(contains("Added category: Coffee"));
    moni(home.path())
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(contains("Coffee"));
}

#[test]
fn duplicate_category_fails() {
    let home = initialized_home();
    moni(home.path())
        .args(["categories", "add", "Groceries"])
        .assert()
        .failure()
        .stderr(contains("Category already exists: Groceries"));
}

#[test]
fn status_reports_counts() {
    let home = initialized_home();
    moni(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Transactions:  0"));
}

#[test]
fn import_missing_file_fails() {
    let home = initialized_home();
    moni(home.path())
        .args(["import", "no-such-statement.pdf"])
        .assert()
        .failure()
        .stderr(contains("Error:"));
}
