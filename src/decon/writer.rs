use crate::error::{ToolError, ToolResult};
use crate::fs::FileSystem;
use std::path::Path;
use tracing::info;

/// Persists a composed script and marks it executable
pub struct ScriptWriter<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ScriptWriter<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    pub fn write(&self, path: &Path, text: &str) -> ToolResult<()> {
        self.fs
            .write_file(path, text, true)
            .map_err(|e| ToolError::io(path, &e))?;
        info!(script = %path.display(), "wrote deconvolution script");
        Ok(())
    }
}
