// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::process::{Command, Output};

fn model_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../tests/models")
        .join(name)
}

fn command(args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stepmesh-export"));
    command
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("STEPMESH_DEFLECTION")
        .env_remove("STEPMESH_ANGLE")
        .env_remove("STEPMESH_UNIT");
    command
}

fn run(args: &[&str]) -> Output {
    command(args).output().expect("failed to run stepmesh-export")
}

fn max_x(output: &Output) -> f64 {
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    doc["bounds"]["max"][0].as_f64().unwrap()
}

fn model_arg(name: &str) -> String {
    model_path(name).to_string_lossy().into_owned()
}

#[test]
fn test_missing_argument_prints_usage() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Usage: stepmesh-export"));
}

#[test]
fn test_exports_cube() {
    let output = run(&[&model_arg("cube.step")]);
    assert_eq!(output.status.code(), Some(0));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["meshes"][0]["id"], "mesh-0");
    let indices = doc["meshes"][0]["indices"].as_array().unwrap().len();
    assert!(indices >= 36);
    assert_eq!(indices % 3, 0);
    assert_eq!(doc["edges"], serde_json::json!([]));
}

#[test]
fn test_unit_flag() {
    let mm = run(&[&model_arg("cube.step"), "--unit", "mm"]);
    let m = run(&[&model_arg("cube.step"), "--unit", "m", "--deflection"]);
    assert!(mm.status.success() && m.status.success());

    assert!((max_x(&m) - 1000.0 * max_x(&mm)).abs() < 1e-9);
}

#[test]
fn test_environment_sets_defaults() {
    let mm = run(&[&model_arg("cube.step")]);
    let m = command(&[&model_arg("cube.step")])
        .env("STEPMESH_UNIT", "m")
        .output()
        .unwrap();
    assert!(m.status.success());
    assert!((max_x(&m) - 1000.0 * max_x(&mm)).abs() < 1e-9);
}

#[test]
fn test_flags_override_environment() {
    let default = run(&[&model_arg("cube.step")]);
    let flagged = command(&[&model_arg("cube.step"), "--unit", "mm", "--deflection", "0.2"])
        .env("STEPMESH_UNIT", "m")
        .env("STEPMESH_DEFLECTION", "5")
        .output()
        .unwrap();
    assert!(flagged.status.success());
    assert_eq!(flagged.stdout, default.stdout);
}

#[test]
fn test_invalid_numbers_fall_back() {
    let default = run(&[&model_arg("cylinder.step")]);
    let output = run(&[
        &model_arg("cylinder.step"),
        "--deflection",
        "abc",
        "--angle",
        "",
        "--extra",
    ]);
    assert!(output.status.success());
    assert_eq!(output.stdout, default.stdout);

    // A coarser deflection changes the cylinder, so the match above means
    // the defaults were used
    let coarse = run(&[&model_arg("cylinder.step"), "--deflection", "2"]);
    assert_ne!(coarse.stdout, default.stdout);
}

#[test]
fn test_no_tessellated_faces() {
    let output = run(&[&model_arg("unsupported_surface.step")]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "No mesh data extracted.");
}

#[test]
fn test_repeated_runs_are_identical() {
    let first = run(&[&model_arg("cylinder.step")]);
    let second = run(&[&model_arg("cylinder.step")]);
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_failures() {
    let cases = [
        ("empty.step", "STEP file has no shapes."),
        ("not_step.txt", "Failed to read STEP file."),
        ("missing.step", "Failed to read STEP file."),
    ];
    for (name, message) in cases {
        let output = run(&[&model_arg(name)]);
        assert_eq!(output.status.code(), Some(1), "{}", name);
        assert!(output.stdout.is_empty(), "{}", name);
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), message);
    }
}
