use std::fs;
use std::path::Path;
use std::process::Command;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

const SMALL_CONFIG: &str = r#"
version = 1

[resolution]
width = 16
height = 8

[lic]
steps = 3

[advection]
steps = 4

[animation]
frames = 2
seed = 9
"#;

fn oceanflow() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_oceanflow"));
    command.env_remove("OCEANFLOW_CONFIG").env("RUST_LOG", "warn");
    command
}

/// Left half land, right half water drifting east.
fn write_field(path: &Path, width: u32, height: u32) {
    RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgb([128, 128, 0])
        } else {
            Rgb([200, 128, 255])
        }
    })
    .save(path)
    .unwrap();
}

#[test]
fn programs_json_lists_all_five_programs() {
    let output = oceanflow().args(["programs", "--json"]).output().unwrap();
    assert!(output.status.success());

    let programs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<_> = programs
        .as_array()
        .unwrap()
        .iter()
        .map(|program| program["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        ["noiseTransport", "orthogonalLic", "advection", "blend", "globe"]
    );
}

#[test]
fn check_validates_every_program() {
    let output = oceanflow().arg("check").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().filter(|line| line.starts_with("ok ")).count(), 5);
}

#[test]
fn invalid_config_is_rejected() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("flow.toml");
    fs::write(&config, "[blend]\nlic = 0.5\nadvected = 0.9\n").unwrap();

    let status = oceanflow()
        .arg("--config")
        .arg(&config)
        .arg("check")
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn cpu_render_writes_blended_and_globe_images() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("flow.toml");
    let field = root.path().join("field.png");
    let out = root.path().join("out");
    fs::write(&config, SMALL_CONFIG).unwrap();
    write_field(&field, 16, 8);

    let status = oceanflow()
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg("--field")
        .arg(&field)
        .arg("--out")
        .arg(&out)
        .args(["--backend", "cpu", "--globe-size", "24x24"])
        .status()
        .unwrap();
    assert!(status.success());

    let blended = image::open(out.join("blended.png")).unwrap().to_rgba8();
    assert_eq!(blended.dimensions(), (16, 8));
    assert!(blended.pixels().all(|pixel| pixel[3] == 255));

    let globe = image::open(out.join("globe.png")).unwrap().to_rgba8();
    assert_eq!(globe.dimensions(), (24, 24));
    // The sphere does not reach the corners of the view.
    assert_eq!(globe.get_pixel(0, 0)[3], 0);
    assert_eq!(globe.get_pixel(23, 23)[3], 0);
}

#[test]
fn field_with_the_wrong_size_fails_render() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("flow.toml");
    let field = root.path().join("field.png");
    fs::write(&config, SMALL_CONFIG).unwrap();
    write_field(&field, 8, 8);

    let output = oceanflow()
        .arg("--config")
        .arg(&config)
        .arg("render")
        .arg("--field")
        .arg(&field)
        .arg("--out")
        .arg(root.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("16x8"), "{stderr}");
}
