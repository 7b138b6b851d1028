//! Engine command lines

use crate::config::RcloneConfig;
use crate::error::Result;
use crate::types::{Operation, RunRequest};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::time::Duration;

/// A program and its arguments, ready to spawn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCommand {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<OsString>,
    /// Extra environment variables
    pub envs: Vec<(OsString, OsString)>,
}

impl EngineCommand {
    /// Command running `program` with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.envs
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Human-readable command line for logs
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Builds the engine command for a run
pub trait CommandFactory: Send + Sync {
    /// Command line implementing `request`
    fn build(&self, request: &RunRequest) -> Result<EngineCommand>;
}

/// Command factory for the rclone CLI
#[derive(Clone, Debug)]
pub struct RcloneCommandFactory {
    binary_path: PathBuf,
    stats_interval: Duration,
    extra_flags: Vec<String>,
}

impl RcloneCommandFactory {
    /// Factory using an explicit rclone binary and default flags
    pub fn new(binary_path: PathBuf) -> Self {
        let defaults = RcloneConfig::default();
        Self {
            binary_path,
            stats_interval: defaults.stats_interval,
            extra_flags: defaults.extra_flags,
        }
    }

    /// Factory resolved from configuration
    ///
    /// Fails with [`crate::Error::Config`] when no binary is configured and
    /// none is found in PATH.
    pub fn from_config(config: &RcloneConfig) -> Result<Self> {
        Ok(Self {
            binary_path: config.resolve_binary()?,
            stats_interval: config.stats_interval,
            extra_flags: config.extra_flags.clone(),
        })
    }

    fn logging_flags(&self) -> Vec<String> {
        vec![
            "--use-json-log".to_string(),
            "--stats".to_string(),
            format!("{}s", self.stats_interval.as_secs().max(1)),
            // notice-level lines are emitted with "level":"warning" in JSON logs
            "--stats-log-level".to_string(),
            "NOTICE".to_string(),
        ]
    }
}

impl CommandFactory for RcloneCommandFactory {
    fn build(&self, request: &RunRequest) -> Result<EngineCommand> {
        match &request.operation {
            Operation::Download { source, target } => {
                let remote_path = format!("{}:{}", request.remote.id, source.path);
                let destination = if source.is_dir {
                    target.join(&source.name)
                } else {
                    target.clone()
                };
                Ok(EngineCommand::new(&self.binary_path)
                    .arg("copy")
                    .arg(remote_path)
                    .arg(destination)
                    .args(self.logging_flags())
                    .args(&self.extra_flags))
            }
        }
    }
}
