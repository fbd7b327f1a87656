use crate::error::{ToolError, ToolResult};
use crate::fs::FileSystem;
use std::path::{Path, PathBuf};

/// Point-in-time view of one directory of interest
///
/// Nothing here is refreshed: take a new snapshot after changing the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Logical name, e.g. `root_dir`
    pub name: String,
    /// Path as given
    pub path: PathBuf,
    pub exists: bool,
    pub abspath: PathBuf,
    /// Parent of `abspath`
    pub head: PathBuf,
    /// Last component of `abspath`
    pub tail: String,
}

impl DirectoryRecord {
    pub fn snapshot(fs: &dyn FileSystem, name: &str, path: impl AsRef<Path>) -> ToolResult<Self> {
        let path = path.as_ref();
        let abspath = fs.absolute(path).map_err(|e| {
            ToolError::Config(format!("cannot resolve {} '{}': {:#}", name, path.display(), e))
        })?;

        let head = abspath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| abspath.clone());
        let tail = abspath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            exists: fs.is_dir(&abspath),
            abspath,
            head,
            tail,
        })
    }
}
