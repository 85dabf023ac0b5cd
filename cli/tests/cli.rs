// cli/tests/cli.rs — end-to-end runs of the sighaxctl binary

use std::fs;

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use serde_json::Value;
use sighax_boot::digest::{hex_upper, sha256};

fn sighaxctl() -> Command {
    let mut cmd = Command::cargo_bin("sighaxctl").unwrap();
    cmd.env_remove("SIGHAX_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn run_json(args: &[&str]) -> Value {
    let out = sighaxctl().arg("--json").args(args).assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn verdicts(report: &Value) -> Vec<String> {
    report["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["verdict"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn legit_text_reports_verified() {
    let out = sighaxctl().arg("legit").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("[09] VERIFIED"), "{}", text);
    assert!(text.trim_end().ends_with("result: VERIFIED"));
}

#[test]
fn legit_json_has_ten_steps() {
    let report = run_json(&["legit", "--firmware", "NATIVE_FIRM"]);
    assert_eq!(verdicts(&report).len(), 10);
    assert_eq!(report["result"], "VERIFIED");
    assert_eq!(report["firmware"]["sha256"], hex_upper(&sha256(b"NATIVE_FIRM")));
    assert_eq!(report["block"]["offsets"]["calc_hash"], 128);
}

#[test]
fn exploit_json_ends_compromised() {
    let report = run_json(&["exploit"]);
    assert_eq!(
        verdicts(&report),
        vec!["INFO", "EXPLOITED", "VULNERABLE", "INFO", "VULNERABLE", "EXPLOITED", "EXPLOITED", "COMPROMISED"]
    );
    assert_eq!(report["forge"]["forged_skip"], 15);
    assert_eq!(report["forge"]["lands_at"], report["forge"]["correct_hash_offset"]);
}

#[test]
fn corrupted_header_fails_but_exits_cleanly() {
    let report = run_json(&["legit", "--corrupt", "0=0x01"]);
    assert_eq!(verdicts(&report), vec!["INFO", "INFO", "FAIL"]);
    assert_eq!(report["result"], "FAIL");
}

#[test]
fn corrupted_hash_fails_at_comparison() {
    let report = run_json(&["legit", "--corrupt", "96=0x00", "--corrupt", "97=0x00"]);
    let v = verdicts(&report);
    assert_eq!(v.len(), 10);
    assert_eq!(v.last().map(String::as_str), Some("FAIL"));
}

#[test]
fn corrupt_offset_past_block_is_rejected() {
    sighaxctl().args(["legit", "--corrupt", "128=1"]).assert().failure();
}

#[test]
fn invalid_padding_type_is_an_argument_error() {
    let out = sighaxctl()
        .args(["block", "--padding", "0x03"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    assert!(String::from_utf8_lossy(&out).contains("invalid padding type 0x03"));
}

#[test]
fn block_json_reflects_padding_and_skip() {
    let report = run_json(&["block", "--padding", "unpadded", "--skip", "0x0F"]);
    assert_eq!(report["block"]["padding"], "UNPADDED");
    assert_eq!(report["block"]["skip_len"], 15);
    assert_eq!(report["block"]["offsets"]["correct_hash"], 22);
    let regions = report["regions"].as_array().unwrap();
    assert!(regions.iter().all(|r| r["region"] != "padding"));
}

#[test]
fn columns_flag_changes_dump_width() {
    let out = sighaxctl().args(["block", "--columns", "8"]).assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("00")).collect();
    assert_eq!(rows.len(), 16);
    assert!(rows[1].starts_with("0008"));
}

#[test]
fn config_file_supplies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sighax.toml");
    fs::write(&path, "[firmware]\nevil = \"PWNED_FIRM\"\n\n[display]\njson = true\n").unwrap();

    let out = sighaxctl()
        .arg("--config")
        .arg(&path)
        .arg("exploit")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["forge"]["evil_hash"], hex_upper(&sha256(b"PWNED_FIRM")));
}

#[test]
fn config_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env.toml");
    fs::write(&path, "[firmware]\nlegit = \"ENV_FIRM\"\n").unwrap();

    let out = sighaxctl()
        .env("SIGHAX_CONFIG", &path)
        .args(["--json", "legit"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["firmware"]["sha256"], hex_upper(&sha256(b"ENV_FIRM")));
}

#[test]
fn unreadable_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    sighaxctl()
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("key")
        .assert()
        .failure();
}

#[test]
fn firmware_file_is_hashed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("firm.bin");
    let bytes: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &bytes).unwrap();

    let report = run_json(&["legit", "--firmware-file", path.to_str().unwrap()]);
    assert_eq!(report["firmware"]["len"], 4096);
    assert_eq!(report["result"], "VERIFIED");
}

#[test]
fn anatomy_and_key_print() {
    let anatomy = run_json(&["anatomy"]);
    assert_eq!(anatomy.as_array().unwrap().len(), 13);

    let key = run_json(&["key"]);
    assert_eq!(key["exponent"], 65537);
    assert_eq!(key["modulus_len"], 256);
}

#[test]
fn logs_stay_off_stdout() {
    let out = sighaxctl().args(["-vv", "--json", "legit"]).assert().success().get_output().clone();
    let _: Value = serde_json::from_slice(&out.stdout).unwrap();
}
