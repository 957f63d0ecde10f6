//! Process launcher: activates resolved plugins and hands the process over.
//!
//! The launcher moves through `Idle -> EnvironmentBuilt -> Replaced` or ends
//! in `Failed`. [`Launcher`] tracks the first step and [`PreparedLaunch`] the
//! handover. Every check (manifest against catalog, command resolution) runs
//! before the handover, so a failure never leaves a half-started target.
//!
//! On Unix the target replaces this process (`exec`) and inherits its pid and
//! standard streams; its exit status is the caller's exit status. Other
//! platforms have no image replacement, so the target is spawned and waited
//! on, and [`PreparedLaunch::replace`] returns its status for the caller to
//! forward. In that fallback the wrapper process stays alive until the target
//! exits.

use crate::catalog::PluginIndex;
use crate::error::{BootstrapError, Result};
use crate::manifest::ResolvedManifest;
use crate::runtime::resolve_program;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info};

/// Environment of a process: variable name to value.
pub type Environment = BTreeMap<OsString, OsString>;

/// Environment of the current process.
pub fn current_environment() -> Environment {
    env::vars_os().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchState {
    Idle,
    EnvironmentBuilt,
    /// The target ran. With `exec` this state is never observed in-process.
    Replaced,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
/// Command line plus the variables the wrapper adds on top of the base
/// environment.
pub struct LaunchSpec {
    pub command: Vec<String>,
    pub overlay: BTreeMap<String, String>,
}

/// Merge the activation hooks of every manifest plugin, in manifest order.
///
/// Later plugins win on key collisions. A plugin the catalog does not know
/// is a `ManifestError`: the manifest was not produced from this catalog.
pub fn build_overlay(
    manifest: &ResolvedManifest,
    index: &PluginIndex,
) -> Result<BTreeMap<String, String>> {
    let mut overlay = BTreeMap::new();
    for plugin in manifest.iter() {
        let hooks = index.hooks(plugin).ok_or_else(|| {
            BootstrapError::Manifest(format!("plugin '{plugin}' has no activation hook in the catalog"))
        })?;
        for hook in hooks {
            if let Some(previous) = overlay.insert(hook.key.clone(), hook.value.clone()) {
                if previous != hook.value {
                    debug!(key = %hook.key, plugin = %plugin, "hook overrides earlier plugin");
                }
            }
        }
    }
    Ok(overlay)
}

/// Layer `defaults` (only where `base` is unset), `base`, then `overlay`.
pub fn build_environment(
    base: &Environment,
    defaults: &BTreeMap<String, String>,
    overlay: &BTreeMap<String, String>,
) -> Environment {
    let mut environment = base.clone();
    for (key, value) in defaults {
        environment
            .entry(OsString::from(key))
            .or_insert_with(|| OsString::from(value));
    }
    for (key, value) in overlay {
        environment.insert(OsString::from(key), OsString::from(value));
    }
    environment
}

pub struct Launcher<'a> {
    index: &'a PluginIndex,
    overrides: BTreeMap<String, String>,
    state: LaunchState,
}

impl<'a> Launcher<'a> {
    pub fn new(index: &'a PluginIndex) -> Self {
        Self {
            index,
            overrides: BTreeMap::new(),
            state: LaunchState::Idle,
        }
    }

    /// Operator-supplied variable that wins over the base environment and
    /// every plugin hook.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// Build the environment and resolve the program without starting it.
    pub fn prepare(
        &mut self,
        manifest: &ResolvedManifest,
        command: &[String],
        base: &Environment,
    ) -> Result<PreparedLaunch> {
        let prepared = self.try_prepare(manifest, command, base);
        self.state = match &prepared {
            Ok(_) => LaunchState::EnvironmentBuilt,
            Err(_) => LaunchState::Failed,
        };
        prepared
    }

    fn try_prepare(
        &self,
        manifest: &ResolvedManifest,
        command: &[String],
        base: &Environment,
    ) -> Result<PreparedLaunch> {
        let Some(program_arg) = command.first() else {
            return Err(BootstrapError::Launch("no command given".to_string()));
        };

        let mut overlay = build_overlay(manifest, self.index)?;
        overlay.extend(self.overrides.clone());

        // Agent defaults ride along with active instrumentation only; an empty
        // manifest launches with the base environment untouched.
        let empty = BTreeMap::new();
        let defaults = if manifest.is_empty() {
            &empty
        } else {
            self.index.defaults()
        };
        let environment = build_environment(base, defaults, &overlay);

        let search_path = environment.get(OsStr::new("PATH")).map(OsString::as_os_str);
        let program = resolve_program(OsStr::new(program_arg), search_path).ok_or_else(|| {
            BootstrapError::Launch(format!(
                "'{program_arg}' was not found or is not executable"
            ))
        })?;

        info!(
            program = %program.display(),
            plugins = manifest.len(),
            overlay = overlay.len(),
            "environment built"
        );

        Ok(PreparedLaunch {
            spec: LaunchSpec {
                command: command.to_vec(),
                overlay,
            },
            program,
            environment,
            state: LaunchState::EnvironmentBuilt,
        })
    }
}

#[derive(Debug)]
pub struct PreparedLaunch {
    spec: LaunchSpec,
    program: PathBuf,
    environment: Environment,
    state: LaunchState,
}

impl PreparedLaunch {
    pub fn spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Resolved path of `command[0]`.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full environment the target will receive.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    /// JSON description used by `--dry-run`.
    pub fn describe(&self) -> Value {
        json!({
            "program": self.program.to_string_lossy(),
            "command": self.spec.command,
            "overlay": self.spec.overlay,
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.spec.command[1..])
            .env_clear()
            .envs(&self.environment);
        command
    }

    /// Hand the process over to the target.
    ///
    /// Unix: returns only if `exec` failed, leaving the state `Failed`.
    /// Elsewhere: returns the target's exit status once it finishes.
    #[cfg(unix)]
    pub fn replace(&mut self) -> Result<ExitStatus> {
        use std::os::unix::process::CommandExt;

        let mut command = self.command();
        command.arg0(&self.spec.command[0]);
        info!(program = %self.program.display(), "replacing process");
        let err = command.exec();
        self.state = LaunchState::Failed;
        Err(BootstrapError::Launch(format!(
            "exec {} failed: {err}",
            self.program.display()
        )))
    }

    #[cfg(not(unix))]
    pub fn replace(&mut self) -> Result<ExitStatus> {
        info!(program = %self.program.display(), "spawning target (no exec on this platform)");
        match self.command().status() {
            Ok(status) => {
                self.state = LaunchState::Replaced;
                Ok(status)
            }
            Err(err) => {
                self.state = LaunchState::Failed;
                Err(BootstrapError::Launch(format!(
                    "failed to start {}: {err}",
                    self.program.display()
                )))
            }
        }
    }
}
