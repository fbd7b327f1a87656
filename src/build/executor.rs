//! Sequential execution of build steps with an audit history

use super::planner::BuildPlan;
use crate::error::{ToolError, ToolResult};
use crate::fs::{normalize, FileSystem};
use crate::shell::{command_line, ShellRunner};
use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const HISTORY_HEADER: &str = "shell/system command history";

/// One operation of a build plan
///
/// Relative paths are resolved against the executor's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    ChangeDir(PathBuf),
    MakeDir(PathBuf),
    Move { from: PathBuf, to: PathBuf },
    /// Remove a file or a whole tree
    Remove(PathBuf),
    Shell { program: String, args: Vec<String> },
}

impl Step {
    pub fn shell(program: &str, args: &[&str]) -> Self {
        Step::Shell {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::ChangeDir(path) => write!(f, "cd {}", path.display()),
            Step::MakeDir(path) => write!(f, "mkdir -p {}", path.display()),
            Step::Move { from, to } => write!(f, "mv {} {}", from.display(), to.display()),
            Step::Remove(path) => write!(f, "rm -rf {}", path.display()),
            Step::Shell { program, args } => f.write_str(&command_line(program, args)),
        }
    }
}

/// Append-only record of every operation attempted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandHistory {
    entries: Vec<String>,
}

impl CommandHistory {
    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self, when: DateTime<Local>) -> String {
        let mut lines = vec![format!(
            "{} ({}):",
            HISTORY_HEADER,
            when.format("%Y-%m-%d %H:%M:%S")
        )];
        for (index, entry) in self.entries.iter().enumerate() {
            lines.push(format!("cmd {:2} :  {}", index, entry));
        }
        lines.join("\n   ") + "\n\n"
    }

    /// Write the rendered history into `dir`, returning the file written
    ///
    /// An empty history is not saved.
    pub fn save(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
        file_name: &str,
        when: DateTime<Local>,
    ) -> ToolResult<Option<PathBuf>> {
        if self.is_empty() {
            return Ok(None);
        }
        let path = dir.join(file_name);
        fs.write_file(&path, &self.render(when), false)
            .map_err(|e| ToolError::io(&path, &e))?;
        debug!(path = %path.display(), "saved command history");
        Ok(Some(path))
    }
}

/// Runs steps one at a time, stopping at the first failure
///
/// The executor tracks its own working directory; the process working
/// directory is never changed.
pub struct CommandExecutor<'a> {
    fs: &'a dyn FileSystem,
    shell: &'a dyn ShellRunner,
    cwd: PathBuf,
    history: CommandHistory,
}

impl<'a> CommandExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem, shell: &'a dyn ShellRunner) -> ToolResult<Self> {
        let cwd = fs
            .current_dir()
            .map_err(|e| ToolError::Config(format!("cannot read working directory: {:#}", e)))?;
        Ok(Self::with_cwd(fs, shell, cwd))
    }

    pub fn with_cwd(fs: &'a dyn FileSystem, shell: &'a dyn ShellRunner, cwd: PathBuf) -> Self {
        Self {
            fs,
            shell,
            cwd,
            history: CommandHistory::default(),
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn into_history(self) -> CommandHistory {
        self.history
    }

    pub fn run_plan(&mut self, plan: &BuildPlan) -> ToolResult<()> {
        for planned in plan.steps() {
            if let Some(note) = &planned.note {
                info!("{}", note);
            }
            self.execute(&planned.step)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, step: &Step) -> ToolResult<()> {
        let rendered = step.to_string();
        self.history.push(rendered.clone());
        trace!(cwd = %self.cwd.display(), step = %rendered, "attempting step");

        match step {
            Step::ChangeDir(path) => {
                let target = self.resolve(path);
                if !self.fs.is_dir(&target) {
                    return Err(failed(&rendered, 1, "no such directory"));
                }
                self.cwd = target;
            }
            Step::MakeDir(path) => {
                let target = self.resolve(path);
                self.fs
                    .create_dir_all(&target)
                    .map_err(|e| failed(&rendered, 1, format!("{:#}", e)))?;
            }
            Step::Move { from, to } => {
                let (from, to) = (self.resolve(from), self.resolve(to));
                self.fs
                    .rename(&from, &to)
                    .map_err(|e| failed(&rendered, 1, format!("{:#}", e)))?;
            }
            Step::Remove(path) => {
                let target = self.resolve(path);
                let removed = if self.fs.is_dir(&target) {
                    self.fs.remove_dir_all(&target)
                } else {
                    self.fs.remove_file(&target)
                };
                removed.map_err(|e| failed(&rendered, 1, format!("{:#}", e)))?;
            }
            Step::Shell { program, args } => {
                debug!(cwd = %self.cwd.display(), "running '{}'", rendered);
                let output = self
                    .shell
                    .run(program, args, &self.cwd)
                    .map_err(|e| failed(&rendered, 127, format!("{:#}", e)))?;
                trace!(status = output.status, output = %output.output.trim_end(), "finished '{}'", rendered);
                if !output.is_success() {
                    return Err(failed(&rendered, output.status, output.output));
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        normalize(&self.cwd.join(path))
    }
}

fn failed(step: &str, status: i32, output: impl Into<String>) -> ToolError {
    ToolError::Execution {
        step: step.to_string(),
        status,
        output: output.into(),
    }
}
