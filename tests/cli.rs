use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn stack_compositor(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stack-compositor"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

#[test]
fn bare_run_writes_example_and_succeeds() {
    let dir = tempdir().unwrap();
    let output = stack_compositor(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
    let example = std::fs::read_to_string(dir.path().join("example_config.toml")).unwrap();
    assert!(example.contains("[[videos]]"));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn missing_input_exits_non_zero() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("present.mp4"), b"media").unwrap();
    std::fs::write(
        dir.path().join("composite.toml"),
        "[[videos]]\npath = \"present.mp4\"\n\n[[videos]]\npath = \"absent.mp4\"\n",
    )
    .unwrap();

    let output = stack_compositor(dir.path(), &["composite.toml"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.mp4"), "{stderr}");
    assert!(!dir.path().join("output_composite.mp4").exists());
}

#[test]
fn missing_config_exits_non_zero() {
    let dir = tempdir().unwrap();
    let output = stack_compositor(dir.path(), &["nowhere.toml"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere.toml"));
}

#[test]
fn unknown_backend_exits_non_zero() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.mp4"), b"media").unwrap();
    std::fs::write(dir.path().join("composite.toml"), "[[videos]]\npath = \"a.mp4\"\n").unwrap();

    let output = stack_compositor(dir.path(), &["composite.toml", "--backend", "gstreamer"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("gstreamer"));
}

#[test]
fn clear_cache_alone_succeeds() {
    let dir = tempdir().unwrap();
    let output = stack_compositor(dir.path(), &["--clear-cache", "--cache-dir", "cache"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(dir.path().join("cache").join("cache_index.json").exists());
    assert!(!dir.path().join("example_config.toml").exists());
}
