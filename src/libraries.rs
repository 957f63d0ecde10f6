//! Installed-library discovery.
//!
//! The package manager owns introspection; this module only runs it (or reads
//! a listing it produced earlier) and parses the result into
//! [`LibraryRecord`]s. The listing format is the package manager's JSON
//! output: an array of `{"name", "version"}` objects. A single object or
//! newline-delimited objects are accepted too.

use crate::error::{BootstrapError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Discovery command used when neither a listing file nor a command is given.
pub const DEFAULT_DISCOVER_COMMAND: &str = "python -m pip list --format=json";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl LibraryRecord {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// Name in the form used for catalog matching.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Package-index name normalization: lowercase, runs of `-`, `_`, `.` become `-`.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibrarySource {
    /// A listing captured earlier (e.g. during the image build).
    Listing(PathBuf),
    /// Argv of a command whose stdout is a listing.
    Command(Vec<String>),
}

impl LibrarySource {
    pub fn from_command_line(command: &str) -> Result<Self> {
        let argv = split_command(command);
        if argv.is_empty() {
            return Err(BootstrapError::Discovery(
                "discovery command is empty".to_string(),
            ));
        }
        Ok(LibrarySource::Command(argv))
    }
}

/// Materialize the installed-library list from `source`.
pub fn discover(source: &LibrarySource) -> Result<Vec<LibraryRecord>> {
    match source {
        LibrarySource::Listing(path) => {
            let contents =
                fs::read_to_string(path).map_err(|err| BootstrapError::io(path, err))?;
            parse_listing(&contents, path)
        }
        LibrarySource::Command(argv) => {
            let stdout = run_discovery_command(argv)?;
            parse_listing(&stdout, Path::new(&argv[0]))
        }
    }
}

fn run_discovery_command(argv: &[String]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| BootstrapError::Discovery("discovery command is empty".to_string()))?;
    debug!(command = %argv.join(" "), "running discovery command");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|err| BootstrapError::Discovery(format!("failed to run {program}: {err}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BootstrapError::Discovery(format!(
            "{} exited with {}: {}",
            argv.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout).map_err(|_| {
        BootstrapError::Discovery(format!("{} produced non-UTF-8 output", argv.join(" ")))
    })
}

/// Parse a listing document. An empty document is an empty environment.
pub fn parse_listing(input: &str, origin: &Path) -> Result<Vec<LibraryRecord>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let invalid = |detail: String| {
        BootstrapError::Discovery(format!("{}: {detail}", origin.display()))
    };

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<Vec<LibraryRecord>, _>>()
                .map_err(|err| invalid(format!("unable to parse library array: {err}"))),
            Value::Object(_) => serde_json::from_value(value)
                .map(|record| vec![record])
                .map_err(|err| invalid(format!("unable to parse library record: {err}"))),
            _ => Err(invalid(
                "unsupported JSON input; expected object or array".to_string(),
            )),
        };
    }

    let mut records = Vec::new();
    for (idx, line) in trimmed.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: LibraryRecord = serde_json::from_str(line)
            .map_err(|err| invalid(format!("line {}: {err}", idx + 1)))?;
        records.push(record);
    }
    Ok(records)
}

/// Whitespace argv split; quoting is not interpreted.
pub fn split_command(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}
