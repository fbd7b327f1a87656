use super::{command_line, ShellOutput, ShellRunner};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::trace;

/// Launches programs with `std::process::Command`, no intermediate shell
pub struct RealShell;

impl RealShell {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RealShell {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner for RealShell {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<ShellOutput> {
        trace!(cmd = %command_line(program, args), cwd = %cwd.display(), "spawning");

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .with_context(|| format!("Failed to launch '{}'", program))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        // killed by a signal: no code, report as generic failure
        let status = output.status.code().unwrap_or(-1);

        Ok(ShellOutput {
            status,
            output: text,
        })
    }
}
