//! Drives the actual `pyvym` binary's debugger REPL over stdin/stdout,
//! covering the scenarios that need a live breakpoint/`view`/
//! `set local` session rather than a bare library call.

mod common;

use std::io::Write;

use assert_cmd::Command;
use common::CLASS_WITH_METHOD_SRC;

fn write_program(src: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(src.as_bytes()).expect("write program");
    file
}

/// Breakpoint on `s`'s `return` line (3), then `run` — halts with
/// `self.a = 3`, `self.b = 4` visible, and a two-frame backtrace (`s`, module).
#[test]
fn breakpoint_halts_inside_method_with_locals_visible() {
    let program = write_program(CLASS_WITH_METHOD_SRC);
    let output = Command::cargo_bin("pyvym")
        .unwrap()
        .arg(program.path())
        .write_stdin("set bp 3\nrun\nview locals\nview backtrace\nquit\n")
        .output()
        .expect("run pyvym");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Breakpoint Hit"), "stdout:\n{stdout}");
    assert!(stdout.contains("self.a: 3"), "stdout:\n{stdout}");
    assert!(stdout.contains("self.b: 4"), "stdout:\n{stdout}");
    assert!(stdout.contains("P.s"), "stdout:\n{stdout}");
    assert!(stdout.contains("<module>"), "stdout:\n{stdout}");
}

/// `set local a 99` after that breakpoint, then `run`, yields exit code 103.
#[test]
fn set_local_changes_the_return_value() {
    let program = write_program(CLASS_WITH_METHOD_SRC);
    let output = Command::cargo_bin("pyvym")
        .unwrap()
        .arg(program.path())
        .write_stdin("set bp 3\nrun\nset local a 99\nrun\nquit\n")
        .output()
        .expect("run pyvym");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("a: 99"), "stdout:\n{stdout}");
    assert!(stdout.contains("Program Return Value: 103"), "stdout:\n{stdout}");
}

/// Running a program to completion, then running it again without
/// restarting the debugger, yields the same exit code (reset
/// correctness — `Vm::reset` reinitializes the whole module).
#[test]
fn rerun_after_natural_termination_is_deterministic() {
    let program = write_program(CLASS_WITH_METHOD_SRC);
    let output = Command::cargo_bin("pyvym")
        .unwrap()
        .arg(program.path())
        .write_stdin("run\nrun\nquit\n")
        .output()
        .expect("run pyvym");
    let stdout = String::from_utf8_lossy(&output.stdout);

    let occurrences = stdout.matches("Program Return Value: 7").count();
    assert_eq!(occurrences, 2, "stdout:\n{stdout}");
}

/// A malformed breakpoint line argument prints an inline notice instead
/// of being silently discarded, and does not otherwise disturb the session.
#[test]
fn malformed_breakpoint_argument_reports_inline_notice() {
    let program = write_program(CLASS_WITH_METHOD_SRC);
    let output = Command::cargo_bin("pyvym")
        .unwrap()
        .arg(program.path())
        .write_stdin("set bp notanumber\nrun\nquit\n")
        .output()
        .expect("run pyvym");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("invalid breakpoint line: notanumber"), "stdout:\n{stdout}");
    assert!(stdout.contains("Program Return Value: 7"), "stdout:\n{stdout}");
}
