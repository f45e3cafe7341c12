use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn rcpt() -> Command {
    Command::cargo_bin("rcpt").unwrap()
}

#[test]
fn test_extract_from_stdin() {
    rcpt()
        .args(["extract", "-"])
        .write_stdin("123 Main St\nJoe's Diner\n01/05/2024\nTax: 0.92\nTOTAL 12.42 USD\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""total_amount": "12.42""#))
        .stdout(predicate::str::contains(r#""vendor": "Joe's Diner""#))
        .stdout(predicate::str::contains(r#""date": "2024-05-01""#));
}

#[test]
fn test_extract_text_lists_warnings() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("receipt.txt");
    fs::write(&input, "CORNER SHOP\nTotal 4.20").unwrap();

    rcpt()
        .args(["extract", "--format", "text"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("total_amount"))
        .stdout(predicate::str::contains("Could not extract tax_amount"));
}

#[test]
fn test_extract_missing_file() {
    rcpt()
        .args(["extract", "/nonexistent/receipt.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_undecodable_image_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"defaults": {"currency": "EUR"}}"#).unwrap();
    let input = dir.path().join("receipt.png");
    fs::write(&input, "not an image").unwrap();

    rcpt()
        .arg("--config")
        .arg(&config)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""vendor": "Unknown""#))
        .stdout(predicate::str::contains(r#""currency": "EUR""#))
        .stdout(predicate::str::contains(r#""category": "Uncategorized""#));
}

#[test]
fn test_process_csv_header() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    let input = dir.path().join("receipt.png");
    fs::write(&input, "").unwrap();

    rcpt()
        .arg("--config")
        .arg(&config)
        .args(["process", "--format", "csv"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "id,date,vendor,total_amount,tax_amount,currency,payment_method,category,notes,image_path,raw_text,created_at,updated_at",
        ));
}

#[test]
fn test_process_missing_input() {
    rcpt()
        .args(["process", "/nonexistent/receipt.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("rcpt.json");

    rcpt()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();

    rcpt()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "defaults.category", "Groceries"])
        .assert()
        .success();

    rcpt()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "defaults.category"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Groceries"));

    rcpt()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "defaults.colour", "red"])
        .assert()
        .failure();
}
