use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::collections::{HashMap, HashSet};
#[cfg(test)]
use std::sync::{Arc, RwLock};

/// Trait for filesystem operations to enable testing with mocks
pub trait FileSystem: Send + Sync {
    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents to file, creating parent directories
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read directory entries
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Real filesystem implementation using std::fs
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
        }

        std::fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {:?}", path))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            paths.push(entry.path());
        }

        Ok(paths)
    }
}

/// Mock filesystem implementation for testing (in-memory)
#[cfg(test)]
pub struct MockFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    directories: Arc<RwLock<HashSet<PathBuf>>>,
    read_only: bool,
}

#[cfg(test)]
impl MockFileSystem {
    /// Create new empty mock filesystem
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            directories: Arc::new(RwLock::new(HashSet::new())),
            read_only: false,
        }
    }

    /// Every write fails, as when the config directory cannot be created
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Seed a file (and its parent directories)
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        let path = path.into();
        self.insert(&path, contents);
        self
    }

    /// Get captured file contents for testing assertions
    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    fn insert(&self, path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            self.add_dirs(parent);
        }

        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
    }

    fn add_dirs(&self, path: &Path) {
        let mut directories = self.directories.write().unwrap();
        let mut current = Some(path);
        while let Some(dir) = current {
            directories.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

#[cfg(test)]
impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("File not found in mock filesystem: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if self.read_only {
            anyhow::bail!("Failed to write file: {:?} (read-only filesystem)", path);
        }
        self.insert(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.directories.read().unwrap().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let directories = self.directories.read().unwrap();
        if !directories.contains(path) {
            anyhow::bail!("Directory not found in mock filesystem: {:?}", path);
        }

        let files = self.files.read().unwrap();
        let mut entries: Vec<PathBuf> = files
            .keys()
            .filter(|file_path| file_path.parent() == Some(path))
            .cloned()
            .collect();

        entries.extend(
            directories
                .iter()
                .filter(|dir_path| dir_path.parent() == Some(path))
                .cloned(),
        );

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_write_creates_parents() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/home/u/.config/bacpacman/config.yaml"), "a: 1")
            .unwrap();

        assert!(fs.exists(Path::new("/home/u/.config/bacpacman")));
        assert!(fs.is_file(Path::new("/home/u/.config/bacpacman/config.yaml")));
    }

    #[test]
    fn test_mock_read_dir_lists_direct_children_only() {
        let fs = MockFileSystem::new()
            .with_file("/work/a.bacpac", "")
            .with_file("/work/nested/b.bacpac", "");

        let mut entries = fs.read_dir(Path::new("/work")).unwrap();
        entries.sort();
        assert_eq!(
            entries,
            vec![PathBuf::from("/work/a.bacpac"), PathBuf::from("/work/nested")]
        );
    }

    #[test]
    fn test_real_filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("file.txt");

        RealFileSystem.write(&path, "hello").unwrap();
        assert!(RealFileSystem.is_file(&path));
        assert_eq!(RealFileSystem.read_to_string(&path).unwrap(), "hello");
        assert_eq!(RealFileSystem.read_dir(&dir.path().join("sub")).unwrap(), vec![path]);
    }
}
