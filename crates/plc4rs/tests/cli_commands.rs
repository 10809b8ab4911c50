#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn plc4rs(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_plc4rs"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("plc4rs should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn version_prints_package_version() {
    let output = plc4rs(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("plc4rs {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_extended_lists_provenance() {
    let output = plc4rs(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: plc4rs"));
    assert!(stdout.contains("target_os: "));
}

#[test]
fn parse_outputs_fields_as_json() {
    let output = plc4rs(&[
        "--format",
        "json",
        "parse",
        "modbus:tcp://10.0.0.7:502?unit-identifier=1",
    ]);
    assert!(output.status.success());

    let parsed = stdout_json(&output);
    assert_eq!(parsed["protocol_code"], "modbus");
    assert_eq!(parsed["transport_code"], "tcp");
    assert_eq!(parsed["transport_address"], "10.0.0.7:502");
    assert_eq!(parsed["parameters"][0]["key"], "unit-identifier");
    assert_eq!(parsed["parameters"][0]["value"], "1");
}

#[test]
fn parse_without_transport_code_yields_null() {
    let output = plc4rs(&["--format", "json", "parse", "s7://192.168.0.1"]);
    assert!(output.status.success());
    assert!(stdout_json(&output)["transport_code"].is_null());
}

#[test]
fn malformed_connection_string_exits_60() {
    let output = plc4rs(&["--format", "json", "parse", "not-a-connection-string"]);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid connection string"));
}

#[test]
fn selftest_runs_full_lifecycle() {
    let output = plc4rs(&["--format", "json", "selftest", "--items", "4"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let report = stdout_json(&output);
    assert_eq!(report["connected"], true);
    assert_eq!(report["read_items"], 4);
    assert_eq!(report["write_items"], 4);
    assert_eq!(report["bytes_sent"], 16);
    assert_eq!(report["bytes_received"], 16);
    assert_eq!(report["last_frame"], "00 00 01 2c");

    let events: Vec<&str> = report["events"]
        .as_array()
        .expect("events should be an array")
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(events, vec!["driver-loaded", "connected", "disconnected"]);
}

#[test]
fn selftest_with_no_items_still_connects() {
    let output = plc4rs(&["--format", "json", "selftest", "--items", "0"]);
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["read_items"], 0);
    assert_eq!(report["bytes_sent"], 0);
}

#[test]
fn selftest_refused_connection_exits_3() {
    let output = plc4rs(&["--format", "json", "selftest", "--refuse"]);
    assert_eq!(output.status.code(), Some(3));

    let report = stdout_json(&output);
    assert_eq!(report["connected"], false);
    let events = report["events"].as_array().expect("events should be an array");
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["event"], "connect-failed");
    assert_eq!(events[1]["subject"], "passthrough://selftest");
}

#[test]
fn invalid_timeout_is_usage_error() {
    let output = plc4rs(&["selftest", "--timeout", "0s"]);
    assert_eq!(output.status.code(), Some(64));
}
