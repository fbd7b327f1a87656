use super::{command_line, ShellOutput, ShellRunner};
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Test shell: records every invocation and replays canned results
///
/// Commands succeed with empty output unless a response was registered for a
/// matching command-line prefix. With [`RecordingShell::materialize_clones`],
/// `git clone <url>` creates the checkout directory on the real disk, since
/// callers check for its existence afterwards.
#[derive(Default)]
pub struct RecordingShell {
    responses: Mutex<Vec<(String, ShellOutput)>>,
    unlaunchable: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, PathBuf)>>,
    materialize_clones: bool,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn materialize_clones() -> Self {
        Self {
            materialize_clones: true,
            ..Self::default()
        }
    }

    /// Reply with `output` to any command line starting with `prefix`
    pub fn respond(&self, prefix: &str, output: ShellOutput) {
        self.responses
            .lock()
            .unwrap()
            .push((prefix.to_string(), output));
    }

    /// Pretend `program` is not installed
    pub fn missing_program(&self, program: &str) {
        self.unlaunchable.lock().unwrap().push(program.to_string());
    }

    /// Command lines run so far, in order
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(cmd, _)| cmd.clone())
            .collect()
    }

    /// Command lines with the directory each ran in
    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ShellRunner for RecordingShell {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<ShellOutput> {
        let line = command_line(program, args);
        self.calls
            .lock()
            .unwrap()
            .push((line.clone(), cwd.to_path_buf()));

        if self.unlaunchable.lock().unwrap().iter().any(|p| p == program) {
            bail!("mock: '{}' not found", program);
        }

        let canned = self
            .responses
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, out)| out.clone());
        let result = canned.unwrap_or_else(|| ShellOutput::success(""));

        if result.is_success() && self.materialize_clones && program == "git" {
            if let (Some("clone"), Some(url)) = (args.first().map(String::as_str), args.get(1)) {
                let name = url
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .unwrap_or("repo")
                    .trim_end_matches(".git");
                std::fs::create_dir_all(cwd.join(name))?;
            }
        }

        Ok(result)
    }
}
