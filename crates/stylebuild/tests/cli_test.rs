//! Runs the built `stylebuild` binary.

use std::process::{Command, Stdio};

fn stylebuild() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stylebuild"));
    command.env("STYLEBUILD_DART_SASS", "/nonexistent/sass");
    command
}

#[test]
fn test_version_ignores_other_arguments() {
    let output = stylebuild()
        .args(["--not-a-flag", "--version"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        env!("CARGO_PKG_VERSION")
    );
}

#[test]
fn test_plain_css_to_stdout() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("a.css"), ".a{b:c}").unwrap();

    let output = stylebuild()
        .current_dir(temp.path())
        .args(["a.css", "--no-tailwind"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), ".a{b:c}\n");
}

#[test]
fn test_failed_entry_exits_nonzero() {
    let temp = tempfile::tempdir().unwrap();
    let output = stylebuild()
        .current_dir(temp.path())
        .args(["missing.css", "--outdir", "dist"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not resolve"));
}

#[test]
fn test_watch_exits_when_stdin_closes() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("a.css"), ".a{b:c}").unwrap();

    // stdin is /dev/null, so the drain thread sees EOF right away.
    let status = stylebuild()
        .current_dir(temp.path())
        .args(["a.css", "--outdir", "dist", "--watch=forever", "--no-tailwind"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success());
}
