//! Integration tests for the plotbox CLI.
//!
//! These run the actual binary and check output, exit codes and file system
//! effects. None of them needs a Docker daemon: every case fails or finishes
//! before a container would be started.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// -----------------------------------------------------------------------------
// Test helpers
// -----------------------------------------------------------------------------

/// Creates a Command for the plotbox binary.
#[allow(deprecated)]
fn plotbox() -> Command {
    let mut cmd = Command::cargo_bin("plotbox").expect("failed to find plotbox binary");
    cmd.env_remove("PLOTBOX_CONFIG").env_remove("PLOTBOX_DB");
    cmd
}

/// Creates a Command for plotbox running in `dir`, with its database and
/// workspaces inside `dir` too.
fn plotbox_in(dir: &TempDir) -> Command {
    let mut cmd = plotbox();
    cmd.current_dir(dir.path())
        .arg("--db")
        .arg(dir.path().join("gallery.db"))
        .arg("--tmpdir")
        .arg(dir.path());
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

// -----------------------------------------------------------------------------
// Help and version tests
// -----------------------------------------------------------------------------

#[test]
fn test_help_shows_all_commands() {
    plotbox()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plotbox"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plot"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("replot"));
}

#[test]
fn test_version_shows_version() {
    plotbox()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("plotbox"));
}

#[test]
fn test_run_help_shows_render_flags() {
    plotbox()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--file"))
        .stdout(predicate::str::contains("NAME=PATH"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--dpi"))
        .stdout(predicate::str::contains("--width"))
        .stdout(predicate::str::contains("--height"))
        .stdout(predicate::str::contains("--out"));
}

// -----------------------------------------------------------------------------
// Init command tests
// -----------------------------------------------------------------------------

#[test]
fn test_init_creates_config() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"))
        .stdout(predicate::str::contains("Next steps"));

    let content = fs::read_to_string(dir.path().join("plotbox.toml")).unwrap();
    assert!(content.contains("[sandbox]"));
    assert!(content.contains("quay.io/edvakf/r-ggplot2"));
}

#[test]
fn test_init_skips_existing_without_force() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plotbox.toml", "# mine\n");

    plotbox_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    assert_eq!(
        fs::read_to_string(dir.path().join("plotbox.toml")).unwrap(),
        "# mine\n"
    );
}

#[test]
fn test_init_force_overwrites() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plotbox.toml", "# mine\n");

    plotbox_in(&dir)
        .args(["init", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("overwritten"));

    let content = fs::read_to_string(dir.path().join("plotbox.toml")).unwrap();
    assert!(content.contains("[render]"));
}

// -----------------------------------------------------------------------------
// Input validation tests
// -----------------------------------------------------------------------------

#[test]
fn test_run_rejects_unsafe_file_name() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(read.csv('data'))");
    write(&dir, "data.txt", "x\n1\n");

    plotbox_in(&dir)
        .args(["run", "plot.R", "--file", "../escape=data.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("[0-9a-zA-Z_]"));
}

#[test]
fn test_plot_rejects_dotted_file_name() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(read.csv('data.csv'))");
    write(&dir, "data.txt", "x\n1\n");

    plotbox_in(&dir)
        .args(["plot", "plot.R", "--file", "data.csv=data.txt"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("data.csv"));
}

#[test]
fn test_run_rejects_empty_code() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "  \n\t\n");

    plotbox_in(&dir)
        .args(["run", "plot.R"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot execute empty code"));
}

#[test]
fn test_run_rejects_empty_code_from_stdin() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .args(["run", "-"])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot execute empty code"));
}

#[test]
fn test_run_rejects_out_of_range_dpi() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(1)");

    plotbox_in(&dir)
        .args(["run", "plot.R", "--dpi", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("DPI must be between 1 and 1200"));
}

#[test]
fn test_run_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(1)");

    plotbox_in(&dir)
        .args(["run", "plot.R", "--format", "gif"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gif"));
}

#[test]
fn test_run_missing_code_file() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .args(["run", "missing.R"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read code from missing.R"));
}

#[test]
fn test_malformed_file_argument() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(1)");

    plotbox_in(&dir)
        .args(["run", "plot.R", "--file", "data_csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=PATH"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    write(&dir, "plot.R", "plot(1)");
    write(&dir, "plotbox.toml", "[sandbox\n");

    plotbox_in(&dir)
        .args(["run", "plot.R"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

// -----------------------------------------------------------------------------
// Gallery lookup tests
// -----------------------------------------------------------------------------

#[test]
fn test_show_unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .args(["show", "abcde"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Plot not found: abcde"));

    // The store was created on first use
    assert!(dir.path().join("gallery.db").exists());
}

#[test]
fn test_show_malformed_id_is_not_found() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .args(["show", "../../etc"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Plot not found"));
}

#[test]
fn test_render_unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();

    plotbox_in(&dir)
        .args(["render", "zzzzz", "--format", "png"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Plot not found: zzzzz"));
}

#[test]
fn test_replot_unknown_id_is_not_found() {
    let dir = TempDir::new().unwrap();
    write(&dir, "new.csv", "x\n2\n");

    plotbox_in(&dir)
        .args(["replot", "zzzzz", "--file", "data_csv=new.csv"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Plot not found: zzzzz"));
}

#[test]
fn test_replot_rejects_unsafe_file_name() {
    let dir = TempDir::new().unwrap();
    write(&dir, "new.csv", "x\n2\n");

    plotbox_in(&dir)
        .args(["replot", "zzzzz", "--file", "a/b=new.csv"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("[0-9a-zA-Z_]"));
}

#[test]
fn test_storage_failure_shows_generic_message() {
    let dir = TempDir::new().unwrap();
    write(&dir, "blocker", "");

    plotbox()
        .current_dir(dir.path())
        .arg("--db")
        .arg(dir.path().join("blocker").join("sub").join("gallery.db"))
        .args(["show", "abcde"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Internal error"));
}
