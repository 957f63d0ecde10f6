#![cfg(unix)]

// End-to-end behavior of the wrapper binaries: resolution, installation,
// environment injection, and exit-code transparency.
mod support;

use anyhow::Result;
use instrumentrunner::EXIT_PRE_LAUNCH;
use serde_json::{Value, json};
use std::fs;
use support::{
    BOOTSTRAP, EXEC, Fixture, RUNNER, binary, read_lines, run_command, stdout_lines,
};

const REPORT_HOOKS: &str = r#"echo "P1=${P1_ACTIVE:-unset} P2=${P2_ACTIVE:-unset}""#;

#[test]
fn scenario_a_exclusion_keeps_serverless_plugin_inactive() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2"), ("serverless-sdk", "1.0")]))
        .args(["--skip-install", "--exclude", "P2", "--", "sh", "-c", REPORT_HOOKS]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_lines(&output), vec!["P1=yes P2=unset"]);
    Ok(())
}

#[test]
fn scenario_b_without_exclusions_activates_both() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("serverless-sdk", "1.0"), ("web-framework", "4.2")]))
        .args(["--skip-install", "--", "sh", "-c", REPORT_HOOKS]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_lines(&output), vec!["P1=yes P2=yes"]);
    Ok(())
}

#[test]
fn scenario_c_empty_environment_still_launches_untouched() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[]))
        .args([
            "--skip-install",
            "--",
            "sh",
            "-c",
            r#"echo "${P1_ACTIVE:-unset} ${OTEL_TRACES_EXPORTER:-unset}"; exit 7"#,
        ]);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(stdout_lines(&output), vec!["unset unset"]);
    Ok(())
}

#[test]
fn scenario_d_missing_binary_reports_reserved_code() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2")]))
        .args(["--skip-install", "--", "/no/such/binary"]);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(EXIT_PRE_LAUNCH));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("launch error") && stderr.contains("/no/such/binary"),
        "stderr was: {stderr}"
    );
    Ok(())
}

#[test]
fn wrapped_exit_code_passes_through() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2")]))
        .args(["--skip-install", "--", "sh", "-c", "exit 42"]);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(42));
    Ok(())
}

#[test]
fn catalog_defaults_apply_only_when_unset() -> Result<()> {
    let fx = Fixture::new();
    let catalog = fx.scenario_catalog();
    let listing = fx.listing(&[("web-framework", "4.2")]);
    let script = r#"echo "$OTEL_TRACES_EXPORTER""#;

    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(&listing)
        .args(["--skip-install", "--", "sh", "-c", script]);
    assert_eq!(stdout_lines(&run_command(cmd)?), vec!["otlp"]);

    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(&listing)
        .env("OTEL_TRACES_EXPORTER", "console")
        .args(["--skip-install", "--", "sh", "-c", script]);
    assert_eq!(stdout_lines(&run_command(cmd)?), vec!["console"]);
    Ok(())
}

#[test]
fn service_name_flag_overrides_environment() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[]))
        .env("OTEL_SERVICE_NAME", "from-env")
        .args([
            "--skip-install",
            "--service-name",
            "checkout",
            "--",
            "sh",
            "-c",
            r#"echo "$OTEL_SERVICE_NAME""#,
        ]);
    let output = run_command(cmd)?;
    assert_eq!(stdout_lines(&output), vec!["checkout"]);
    Ok(())
}

#[test]
fn installs_each_resolved_plugin_once() -> Result<()> {
    let fx = Fixture::new();
    let (installer, log) = fx.recording_installer();
    let catalog = fx.scenario_catalog();

    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2"), ("serverless-sdk", "1.0")]))
        .arg("--install-command")
        .arg(&installer)
        .args(["--exclude", "P2", "--", "true"]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(read_lines(&log), vec!["P1"]);

    // The plugin now shows up in the listing; a second bootstrap is a no-op.
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2"), ("serverless-sdk", "1.0"), ("P1", "0.1")]))
        .arg("--install-command")
        .arg(&installer)
        .args(["--exclude", "P2", "--", "true"]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(read_lines(&log), vec!["P1"]);
    Ok(())
}

#[test]
fn install_failure_aborts_before_launch() -> Result<()> {
    let fx = Fixture::new();
    let marker = fx.path("started");
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2")]))
        .arg("--install-command")
        .arg(fx.failing_installer())
        .arg("--")
        .arg("touch")
        .arg(&marker);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(EXIT_PRE_LAUNCH));
    assert!(!marker.exists(), "target must not start after a failed install");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("index unreachable"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn dry_run_describes_launch_without_installing() -> Result<()> {
    let fx = Fixture::new();
    let (installer, log) = fx.recording_installer();
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2")]))
        .arg("--install-command")
        .arg(&installer)
        .args(["--dry-run", "--", "sh", "-c", "exit 9"]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    let described: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(described["command"], json!(["sh", "-c", "exit 9"]));
    assert_eq!(described["overlay"], json!({"P1_ACTIVE": "yes"}));
    assert!(described["program"].as_str().unwrap().ends_with("/sh"));
    assert!(!log.exists());
    Ok(())
}

#[test]
fn malformed_catalog_is_fatal() -> Result<()> {
    let fx = Fixture::new();
    let catalog = fx.write_json(
        "empty-catalog.json",
        &json!({"schema_version": "plugin_catalog_v1", "entries": []}),
    );
    let mut cmd = binary(RUNNER);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2")]))
        .args(["--skip-install", "--", "true"]);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(EXIT_PRE_LAUNCH));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("catalog error"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn bundled_catalog_drops_excluded_serverless_plugin() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(RUNNER);
    cmd.arg("--libraries")
        .arg(fx.listing(&[
            ("Django", "4.2.7"),
            ("asgiref", "3.7.2"),
            ("opentelemetry-instrumentation", "0.42b0"),
        ]))
        .args([
            "--skip-install",
            "--exclude",
            "opentelemetry-instrumentation-aws-lambda",
            "--dry-run",
            "--",
            "sh",
        ]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    let described: Value = serde_json::from_slice(&output.stdout)?;
    let overlay = described["overlay"].as_object().expect("overlay object");
    assert_eq!(overlay["OTEL_PYTHON_DJANGO_INSTRUMENT"], "true");
    assert_eq!(overlay["OTEL_PYTHON_LOG_CORRELATION"], "true");
    assert!(!overlay.contains_key("OTEL_INSTRUMENTATION_AWS_LAMBDA_FLUSH_TIMEOUT"));
    Ok(())
}

#[test]
fn bootstrap_manifest_feeds_exec() -> Result<()> {
    let fx = Fixture::new();
    let catalog = fx.scenario_catalog();
    let manifest = fx.path("manifest.json");

    let mut cmd = binary(BOOTSTRAP);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--libraries")
        .arg(fx.listing(&[("web-framework", "4.2"), ("serverless-sdk", "1.0")]))
        .arg("--manifest")
        .arg(&manifest)
        .args(["--skip-install", "--exclude", "P2"]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    let written: Value = serde_json::from_str(&fs::read_to_string(&manifest)?)?;
    assert_eq!(written["plugins"], json!(["P1"]));

    let mut cmd = binary(EXEC);
    cmd.arg("--catalog")
        .arg(&catalog)
        .arg("--manifest")
        .arg(&manifest)
        .args(["--", "sh", "-c", REPORT_HOOKS]);
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_lines(&output), vec!["P1=yes P2=unset"]);
    Ok(())
}

#[test]
fn bootstrap_prints_manifest_without_path() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(BOOTSTRAP);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--libraries")
        .arg(fx.listing(&[("serverless-sdk", "1.0"), ("web-framework", "4.2")]))
        .arg("--skip-install");
    let output = run_command(cmd)?;
    assert!(output.status.success(), "{output:?}");
    let printed: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(printed["schema_version"], "plugin_manifest_v1");
    assert_eq!(printed["plugins"], json!(["P1", "P2"]));
    Ok(())
}

#[test]
fn exec_rejects_manifest_plugin_missing_from_catalog() -> Result<()> {
    let fx = Fixture::new();
    let manifest = fx.write_json(
        "manifest.json",
        &json!({"schema_version": "plugin_manifest_v1", "plugins": ["P1", "P9"]}),
    );
    let marker = fx.path("started");
    let mut cmd = binary(EXEC);
    cmd.arg("--catalog")
        .arg(fx.scenario_catalog())
        .arg("--manifest")
        .arg(&manifest)
        .arg("--")
        .arg("touch")
        .arg(&marker);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(EXIT_PRE_LAUNCH));
    assert!(!marker.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("P9"), "stderr was: {stderr}");
    Ok(())
}

#[test]
fn exec_with_missing_manifest_is_fatal() -> Result<()> {
    let fx = Fixture::new();
    let mut cmd = binary(EXEC);
    cmd.arg("--manifest")
        .arg(fx.path("absent.json"))
        .args(["--", "true"]);
    let output = run_command(cmd)?;
    assert_eq!(output.status.code(), Some(EXIT_PRE_LAUNCH));
    Ok(())
}

#[test]
fn bundled_default_service_name_fills_unset_environment() -> Result<()> {
    let fx = Fixture::new();
    let listing = fx.listing(&[("Django", "4.2.7")]);
    let script = r#"echo "$OTEL_SERVICE_NAME""#;

    let mut cmd = binary(RUNNER);
    cmd.arg("--libraries")
        .arg(&listing)
        .args(["--skip-install", "--", "sh", "-c", script]);
    assert_eq!(stdout_lines(&run_command(cmd)?), vec!["python-service"]);

    let mut cmd = binary(RUNNER);
    cmd.arg("--libraries")
        .arg(&listing)
        .env("OTEL_SERVICE_NAME", "hello-django")
        .args(["--skip-install", "--", "sh", "-c", script]);
    assert_eq!(stdout_lines(&run_command(cmd)?), vec!["hello-django"]);
    Ok(())
}
