use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn dump2h5(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dump2h5"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn last_stderr_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .last()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn help_and_version_succeed() {
    let dir = tempfile::tempdir().unwrap();
    for flag in ["--help", "--version"] {
        let output = dump2h5(dir.path(), &[flag]);
        assert_eq!(output.status.code(), Some(0), "{flag}");
        assert!(!output.stdout.is_empty(), "{flag}");
    }
}

#[test]
fn no_arguments_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dump2h5(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("data.h5").exists());
}

#[test]
fn unknown_flag_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dump2h5(dir.path(), &["--bogus", "x"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_dump_reports_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = dump2h5(dir.path(), &["-o", "out.h5", "absent"]);
    assert_eq!(output.status.code(), Some(1));
    let line = last_stderr_line(&output);
    assert!(line.starts_with("dump2h5: "), "{line}");
    assert!(line.contains("absent"), "{line}");
}

#[test]
fn import_succeeds_and_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let values: Vec<u8> = [1.0f64, 2.0].iter().flat_map(|v| v.to_be_bytes()).collect();
    fs::write(dir.path().join("grid"), values).unwrap();
    fs::write(dir.path().join("grid.dims"), "2\n").unwrap();
    fs::write(dir.path().join("grid.dtype"), "float64\n").unwrap();

    let output = dump2h5(dir.path(), &["-o", "out.h5", "grid"]);
    assert_eq!(output.status.code(), Some(0), "{}", last_stderr_line(&output));
    assert!(dir.path().join("out.h5").exists());

    let output = dump2h5(dir.path(), &["-a", "-o", "out.h5", "grid"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(last_stderr_line(&output).starts_with("dump2h5: "));
}
