use std::io;

use calm_io::stdoutln;

use crate::summary::{OutputFormat, RunSummary};

/// SwarmOutput defines all of the different types of data that are printed
/// to `stdout`. Logs and errors go to `stderr`, so the output of a run can
/// be piped somewhere else untouched.
#[derive(Clone, PartialEq, Debug)]
pub enum SwarmOutput {
    /// The result of a load test run
    Summary {
        summary: RunSummary,
        format: OutputFormat,
    },
    /// A scenario rendered as TOML
    Scenario(String),
}

impl SwarmOutput {
    pub fn print(&self) -> io::Result<()> {
        match self {
            SwarmOutput::Summary { summary, format } => summary.print(*format),
            SwarmOutput::Scenario(toml) => stdoutln!("{}", toml.trim_end()),
        }
    }

    /// Process exit code for this output: a run with failed checks or
    /// transport errors exits with 1
    pub fn exit_code(&self) -> i32 {
        match self {
            SwarmOutput::Summary { summary, .. } if !summary.is_success() => 1,
            _ => 0,
        }
    }
}
