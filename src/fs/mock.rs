use super::{FileSystem, FileType};
use anyhow::{anyhow, bail, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: Option<String>,
    pub file_type: FileType,
    pub executable: bool,
}

impl MockEntry {
    fn dir() -> Self {
        Self {
            content: None,
            file_type: FileType::Directory,
            executable: false,
        }
    }
}

/// In-memory file system rooted at a fake working directory
pub struct MockFileSystem {
    files: RwLock<HashMap<PathBuf, MockEntry>>,
    read_only: RwLock<HashSet<PathBuf>>,
    root: PathBuf,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from("/mock"))
    }

    pub fn with_root(root: PathBuf) -> Self {
        let fs = Self {
            files: RwLock::new(HashMap::new()),
            read_only: RwLock::new(HashSet::new()),
            root: root.clone(),
        };
        fs.add_dir(&root);
        fs
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();

        if let Some(parent) = path.parent() {
            ensure_parents(&mut files, parent);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(content.to_string()),
                file_type: FileType::File,
                executable: false,
            },
        );
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = self.normalize_path(path.as_ref());
        let mut files = self.files.write().unwrap();
        ensure_parents(&mut files, &path);
    }

    /// Make writes into `dir` (and below) fail
    pub fn set_read_only(&self, dir: impl AsRef<Path>) {
        let dir = self.normalize_path(dir.as_ref());
        self.read_only.write().unwrap().insert(dir);
    }

    /// All paths currently present, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            super::normalize(path)
        } else {
            super::normalize(&self.root.join(path))
        }
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        let read_only = self.read_only.read().unwrap();
        if read_only.iter().any(|dir| path.starts_with(dir)) {
            bail!("Permission denied: {:?}", path);
        }
        Ok(())
    }
}

fn ensure_parents(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        files.entry(current.clone()).or_insert_with(MockEntry::dir);
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files.read().unwrap().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::File)
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = self.normalize_path(path);
        let files = self.files.read().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))?;

        entry
            .content
            .clone()
            .ok_or_else(|| anyhow!("Not a file: {:?}", path))
    }

    fn write_file(&self, path: &Path, contents: &str, executable: bool) -> Result<()> {
        let path = self.normalize_path(path);
        self.check_writable(&path)?;

        let mut files = self.files.write().unwrap();
        let parent_is_dir = path
            .parent()
            .and_then(|p| files.get(p))
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false);
        if !parent_is_dir {
            bail!("Parent directory missing for {:?}", path);
        }
        if files
            .get(&path)
            .map(|e| e.file_type == FileType::Directory)
            .unwrap_or(false)
        {
            bail!("Is a directory: {:?}", path);
        }

        files.insert(
            path,
            MockEntry {
                content: Some(contents.to_string()),
                file_type: FileType::File,
                executable,
            },
        );
        Ok(())
    }

    fn is_executable(&self, path: &Path) -> bool {
        let path = self.normalize_path(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .map(|e| e.file_type == FileType::File && e.executable)
            .unwrap_or(false)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        self.check_writable(&path)?;

        let mut files = self.files.write().unwrap();
        if files
            .get(&path)
            .map(|e| e.file_type == FileType::File)
            .unwrap_or(false)
        {
            bail!("File exists: {:?}", path);
        }
        ensure_parents(&mut files, &path);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = self.normalize_path(from);
        let to = self.normalize_path(to);
        self.check_writable(&from)?;
        self.check_writable(&to)?;

        let mut files = self.files.write().unwrap();
        if !files.contains_key(&from) {
            bail!("No such file or directory: {:?}", from);
        }
        if files.contains_key(&to) {
            bail!("Destination exists: {:?}", to);
        }

        let moved: Vec<PathBuf> = files
            .keys()
            .filter(|p| p.starts_with(&from))
            .cloned()
            .collect();
        for old in moved {
            if let Some(entry) = files.remove(&old) {
                let target = match old.strip_prefix(&from) {
                    Ok(suffix) if !suffix.as_os_str().is_empty() => to.join(suffix),
                    _ => to.clone(),
                };
                files.insert(target, entry);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        self.check_writable(&path)?;

        let mut files = self.files.write().unwrap();
        match files.get(&path).map(|e| e.file_type) {
            Some(FileType::File) => {
                files.remove(&path);
                Ok(())
            }
            Some(FileType::Directory) => bail!("Is a directory: {:?}", path),
            None => bail!("No such file: {:?}", path),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let path = self.normalize_path(path);
        self.check_writable(&path)?;

        let mut files = self.files.write().unwrap();
        match files.get(&path).map(|e| e.file_type) {
            Some(FileType::Directory) => {
                files.retain(|p, _| !p.starts_with(&path));
                Ok(())
            }
            Some(FileType::File) => bail!("Not a directory: {:?}", path),
            None => bail!("No such directory: {:?}", path),
        }
    }

    fn current_dir(&self) -> Result<PathBuf> {
        Ok(self.root.clone())
    }
}
