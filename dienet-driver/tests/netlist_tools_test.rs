// SPDX-License-Identifier: Apache-2.0

use dienet_test_helpers::single_transistor_die;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_driver(args: &[&str]) -> Output {
    let command_path = env!("CARGO_BIN_EXE_dienet-driver");
    Command::new(command_path)
        .args(args)
        .output()
        .expect("Failed to run dienet-driver")
}

/// Runs `extract` over the single transistor die; returns the config path.
fn extracted_die(dir: &Path) -> PathBuf {
    let config = single_transistor_die().write(dir);
    let output = run_driver(&["extract", config.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    config
}

#[test]
fn test_netlist_stats_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    extracted_die(temp_dir.path());
    let netlist = temp_dir.path().join("die.net");

    let output = run_driver(&["netlist-stats", netlist.to_str().unwrap(), "--format=json"]);
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["width"], 28);
    assert_eq!(stats["height"], 20);
    assert_eq!(stats["channels"], 3);
    assert_eq!(stats["circuits"]["active"], 2);
    assert_eq!(stats["circuits"]["transistor"], 1);
    assert_eq!(stats["circuits"]["total"], 6);
    assert_eq!(stats["nets"], 3);
    assert_eq!(stats["transistors"], 1);
}

#[test]
fn test_netlist_stats_text() {
    let temp_dir = tempfile::tempdir().unwrap();
    extracted_die(temp_dir.path());
    let netlist = temp_dir.path().join("die.net");

    let output = run_driver(&["netlist-stats", netlist.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("die: 28x20, 3 channels"), "{}", stdout);
    assert!(stdout.contains("nets: 3"), "{}", stdout);
    assert!(stdout.contains("transistors: 1"), "{}", stdout);
}

#[test]
fn test_netlist_stats_rejects_malformed_netlist() {
    let temp_dir = tempfile::tempdir().unwrap();
    let netlist = temp_dir.path().join("bad.net");
    std::fs::write(&netlist, "28 20 3\n1 circuits\n").unwrap();

    let output = run_driver(&["netlist-stats", netlist.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));

    let missing = temp_dir.path().join("missing.net");
    let output = run_driver(&["netlist-stats", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_net_names_resolves_pins() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = extracted_die(temp_dir.path());
    let pins = temp_dir.path().join("die.pins");
    std::fs::write(&pins, "# supply and clock\na 5 5 vdd\np 13 16 clk\n").unwrap();

    let output = run_driver(&[
        "net-names",
        config.to_str().unwrap(),
        pins.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0 vdd\n1 clk\n");
}

#[test]
fn test_net_names_rejects_empty_point() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = extracted_die(temp_dir.path());
    let pins = temp_dir.path().join("die.pins");
    std::fs::write(&pins, "m 0 0 gnd\n").unwrap();

    let output = run_driver(&[
        "net-names",
        config.to_str().unwrap(),
        pins.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No circuit at m 0 0"), "{}", stderr);
}
