//! External process abstraction
//!
//! Every external program the tools touch (`3dinfo`, `git`) is launched through
//! [`ShellRunner`], so planners and classifiers can be exercised without the
//! real binaries installed.

mod mock;
mod real;

use anyhow::Result;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub use mock::RecordingShell;
pub use real::RealShell;

/// Exit status plus combined stdout/stderr of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    pub status: i32,
    pub output: String,
}

impl ShellOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            status: 0,
            output: output.into(),
        }
    }

    pub fn failure(status: i32, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Runs a program to completion and captures what it printed
///
/// `Err` means the program could not be launched at all; a program that ran
/// and exited non-zero is reported through [`ShellOutput::status`].
#[cfg_attr(test, mockall::automock)]
pub trait ShellRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<ShellOutput>;
}

/// Render a command line the way it would be typed
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Locate `program` in the directories listed by `path_var` (like `which`)
pub fn find_in_path(program: &str, path_var: Option<OsString>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
