use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const VULNERABLE: &str = r#"pragma solidity ^0.8.0;

contract EtherStore {
    mapping(address => uint256) public balances;

    function withdraw() public {
        uint256 bal = balances[msg.sender];
        (bool sent, ) = msg.sender.call{value: bal}("");
        require(sent);
        balances[msg.sender] = 0;
    }
}
"#;

const CLEAN: &str = r#"pragma solidity ^0.8.0;

contract Counter {
    uint256 private count;

    function current() public view returns (uint256) {
        return count;
    }
}
"#;

fn workspace(source: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Contract.sol"), source).unwrap();
    dir
}

fn solaudit() -> Command {
    Command::cargo_bin("solaudit").unwrap()
}

#[test]
fn test_detectors_lists_builtin_ids() {
    solaudit()
        .arg("detectors")
        .assert()
        .success()
        .stdout(predicate::str::contains("reentrancy"))
        .stdout(predicate::str::contains("tx_origin"))
        .stdout(predicate::str::contains("gas_limit"));
}

#[test]
fn test_json_report_contains_reentrancy() {
    let dir = workspace(VULNERABLE);
    let output = solaudit()
        .args(["scan", "--format", "json", "--input"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let findings = report["findings"].as_array().unwrap();
    assert!(findings.iter().any(|f| f["rule_id"] == "reentrancy"));
    assert_eq!(report["units_analyzed"], 1);
}

#[test]
fn test_fail_on_high_sets_exit_status() {
    let dir = workspace(VULNERABLE);
    solaudit()
        .args(["scan", "--fail-on", "high", "--input"])
        .arg(dir.path().join("Contract.sol"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Reentrancy").or(predicate::str::contains("reentrancy")));
}

#[test]
fn test_clean_contract_passes_gate() {
    let dir = workspace(CLEAN);
    solaudit()
        .args(["scan", "--fail-on", "low", "--input"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn test_missing_input_is_an_error() {
    solaudit()
        .args(["scan", "--input", "/no/such/contracts"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("path does not exist"));
}

#[test]
fn test_markdown_report() {
    let dir = workspace(VULNERABLE);
    solaudit()
        .args(["scan", "--format", "markdown", "--input"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("| High |"));
}

#[test]
fn test_disabled_detector_is_skipped() {
    let dir = workspace(VULNERABLE);
    let output = solaudit()
        .args(["scan", "--format", "json", "--disable", "reentrancy", "--input"])
        .arg(dir.path())
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let findings = report["findings"].as_array().unwrap();
    assert!(findings.iter().all(|f| f["rule_id"] != "reentrancy"));
}
