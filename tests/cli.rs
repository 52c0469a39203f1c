extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn mandel() -> Command {
    Command::cargo_bin("mandel").unwrap()
}

fn read_grey(path: &Path) -> (u32, u32, Vec<u8>) {
    let grey = image::open(path).unwrap().to_luma();
    let (width, height) = (grey.width(), grey.height());
    (width, height, grey.into_raw())
}

#[test]
fn renders_with_every_backend() {
    let dir = TempDir::new().unwrap();
    let mut images = vec![];
    for backend in &["sequential", "parallel", "device"] {
        let out = dir.path().join(format!("{}.pgm", backend));
        mandel()
            .args(&["-o", out.to_str().unwrap(), "-s", "96x64", "-b", backend])
            .assert()
            .success();
        let (width, height, pixels) = read_grey(&out);
        assert_eq!((width, height), (96, 64));
        assert!(pixels.iter().all(|p| *p <= 20));
        // Column 48, row 32 samples -0.5 + 0i.
        assert_eq!(pixels[32 * 96 + 48], 20);
        images.push(pixels);
    }
    assert_eq!(images[0], images[1]);
    assert_eq!(images[0], images[2]);
}

#[test]
fn device_launch_geometry_is_configurable() {
    let dir = TempDir::new().unwrap();
    let small = dir.path().join("small.pgm");
    let large = dir.path().join("large.pgm");
    mandel()
        .args(&["-o", small.to_str().unwrap(), "-s", "50x40", "-b", "device"])
        .args(&["--grid", "1x1", "--block", "3x2"])
        .assert()
        .success();
    mandel()
        .args(&["-o", large.to_str().unwrap(), "-s", "50x40", "-b", "device"])
        .args(&["--grid", "20x20", "--block", "16x16"])
        .assert()
        .success();
    assert_eq!(read_grey(&small), read_grey(&large));
}

#[test]
fn normalize_stretches_to_full_range() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("stretched.pgm");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "-s", "96x64", "-n"])
        .assert()
        .success();
    let (_, _, pixels) = read_grey(&out);
    assert_eq!(pixels[32 * 96 + 48], 255);
    assert_eq!(pixels[32 * 96], 0);
}

#[test]
fn inverted_viewport_is_refused() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("never.pgm");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "-s", "10x10"])
        .args(&["-l", "1.0,1.0", "-r", "-2.0,-1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: precondition failed"));
    assert!(!out.exists());
}

#[test]
fn zero_sized_images_are_refused() {
    mandel()
        .args(&["-o", "unused.pgm", "-s", "0x10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not parse output image size"));
}

#[test]
fn iteration_cap_is_range_checked() {
    mandel()
        .args(&["-o", "unused.pgm", "-i", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Iteration count must be between 1 and 255"));
}

#[test]
fn unknown_devices_are_reported_unavailable() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("never.pgm");
    mandel()
        .args(&["-o", out.to_str().unwrap(), "-s", "10x10", "-b", "device"])
        .args(&["--device", "cuda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no 'cuda' device backend is available"));
}
