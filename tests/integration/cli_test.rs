use anyhow::Result;
use std::io::Write;
use std::process::{Command, Stdio};

/// Build the qxl binary once per test so the spawned paths exist
fn build_cli() -> Result<()> {
    let status = Command::new("cargo")
        .args(["build", "--bin", "qxl"])
        .status()?;

    assert!(status.success(), "Failed to build qxl binary");
    Ok(())
}

/// Run a subcommand with the given stdin and capture its output
fn run_with_stdin(args: &[&str], stdin: &str) -> Result<std::process::Output> {
    let mut child = Command::new("target/debug/qxl")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    child
        .stdin
        .as_mut()
        .expect("stdin requested above")
        .write_all(stdin.as_bytes())?;

    Ok(child.wait_with_output()?)
}

/// Test that validate exits non-zero and reports diagnostics for a bad document
#[test]
fn test_cli_validate_exit_codes() -> Result<()> {
    build_cli()?;

    let bad = r#"<query top="ten"><entity name=""/></query>"#;
    let output = run_with_stdin(&["validate"], bad)?;

    assert!(
        !output.status.success(),
        "validate should exit non-zero for an invalid document"
    );
    let stderr = String::from_utf8(output.stderr)?;
    assert!(
        stderr.contains("validation"),
        "Expected validation diagnostics on stderr, got: {}",
        stderr
    );

    let good = r#"<query><entity name="account"><attribute name="name"/></entity></query>"#;
    let output = run_with_stdin(&["validate"], good)?;

    assert!(output.status.success(), "validate should exit zero: {:?}", output);
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("ok"), "Expected 'ok', got: {}", stdout);

    Ok(())
}

/// Test a full round through the binary: to-xml, then the output fed to to-sql
#[test]
fn test_cli_to_xml_then_to_sql() -> Result<()> {
    build_cli()?;

    let sql = "SELECT name, revenue FROM account WHERE revenue > 1000000 ORDER BY revenue DESC";
    let output = Command::new("target/debug/qxl")
        .args(["to-xml", sql])
        .output()?;

    assert!(output.status.success(), "to-xml failed: {:?}", output);
    let xml = String::from_utf8(output.stdout)?;
    assert!(xml.starts_with("<query"), "Expected a query document, got: {}", xml);
    assert!(xml.contains("<entity name=\"account\">"));

    let output = run_with_stdin(&["to-sql"], &xml)?;
    assert!(output.status.success(), "to-sql failed: {:?}", output);

    let regenerated = String::from_utf8(output.stdout)?;
    assert_eq!(regenerated.trim_end(), sql);

    Ok(())
}

/// Test that to-xml exits non-zero for bad SQL and points at the error
#[test]
fn test_cli_to_xml_error_handling() -> Result<()> {
    build_cli()?;

    let output = Command::new("target/debug/qxl")
        .args(["to-xml", "SELECT FROM account"])
        .output()?;

    assert!(
        !output.status.success(),
        "to-xml should exit non-zero for bad SQL"
    );
    let stderr = String::from_utf8(output.stderr)?;
    assert!(
        stderr.contains("syntax"),
        "Expected a syntax diagnostic on stderr, got: {}",
        stderr
    );

    Ok(())
}

/// Test machine-readable diagnostics with --json
#[test]
fn test_cli_json_diagnostics() -> Result<()> {
    build_cli()?;

    let output = run_with_stdin(
        &["--json", "validate"],
        r#"<query><entity name=""/></query>"#,
    )?;

    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let diagnostics: serde_json::Value = serde_json::from_str(&stdout)?;
    let list = diagnostics.as_array().expect("a JSON array of diagnostics");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["code"], "validation");

    Ok(())
}

/// Test CLI help output
#[test]
fn test_cli_help_output() -> Result<()> {
    build_cli()?;

    let output = Command::new("target/debug/qxl").args(["--help"]).output()?;

    assert!(output.status.success(), "CLI help command failed");
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Usage:"), "Help usage section not found");
    assert!(stdout.contains("Commands:"), "Help commands section not found");
    assert!(stdout.contains("validate"), "validate subcommand not listed");

    Ok(())
}
