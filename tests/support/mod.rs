#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const RUNNER: &str = env!("CARGO_BIN_EXE_instrumentrunner");
pub const BOOTSTRAP: &str = env!("CARGO_BIN_EXE_instrument-bootstrap");
pub const EXEC: &str = env!("CARGO_BIN_EXE_instrument-exec");

/// Command for one of the crate's binaries with the wrapper's configuration
/// variables removed, so a developer's INSTRUMENT_* settings cannot leak in.
pub fn binary(path: &str) -> Command {
    let mut cmd = Command::new(path);
    for var in [
        "INSTRUMENT_CATALOG_PATH",
        "INSTRUMENT_EXCLUDE",
        "INSTRUMENT_DISCOVER_COMMAND",
        "INSTRUMENT_INSTALL_COMMAND",
        "INSTRUMENT_SERVICE_NAME",
        "INSTRUMENT_MANIFEST_PATH",
        "INSTRUMENT_LOG",
        "INSTRUMENT_ALLOWED_CATALOG_SCHEMAS",
        "OTEL_SERVICE_NAME",
        "OTEL_TRACES_EXPORTER",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn run_command(mut cmd: Command) -> Result<Output> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    cmd.output()
        .with_context(|| format!("failed to run {program}"))
}

/// Scratch directory holding catalog, listing, and installer fixtures.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create fixture dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write_json(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).expect("write fixture");
        path
    }

    /// Two-plugin catalog: a web framework plugin and a serverless plugin.
    pub fn scenario_catalog(&self) -> PathBuf {
        self.write_json(
            "catalog.json",
            &json!({
                "schema_version": "plugin_catalog_v1",
                "defaults": {"OTEL_TRACES_EXPORTER": "otlp"},
                "entries": [
                    {"target_library": "web-framework", "plugin_id": "P1",
                     "hook_key": "P1_ACTIVE", "hook_value": "yes"},
                    {"target_library": "serverless-sdk", "plugin_id": "P2",
                     "hook_key": "P2_ACTIVE", "hook_value": "yes"}
                ]
            }),
        )
    }

    pub fn listing(&self, libraries: &[(&str, &str)]) -> PathBuf {
        let records: Vec<Value> = libraries
            .iter()
            .map(|(name, version)| json!({"name": name, "version": version}))
            .collect();
        self.write_json("libraries.json", &Value::Array(records))
    }

    /// Installer stand-in that appends each plugin id to `installs.log`.
    pub fn recording_installer(&self) -> (PathBuf, PathBuf) {
        let log = self.path("installs.log");
        let script = self.path("fake-install.sh");
        fs::write(
            &script,
            format!("#!/bin/sh\necho \"$1\" >> '{}'\n", log.display()),
        )
        .expect("write installer stub");
        make_executable(&script);
        (script, log)
    }

    pub fn failing_installer(&self) -> PathBuf {
        let script = self.path("broken-install.sh");
        fs::write(&script, "#!/bin/sh\necho \"index unreachable\" >&2\nexit 1\n")
            .expect("write installer stub");
        make_executable(&script);
        script
    }
}

pub fn make_executable(path: &Path) {
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
