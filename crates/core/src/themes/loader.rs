//! File access for theme directories.
//!
//! The assembler reads descriptor and template files through [`FileLoader`]
//! so it can run against a real directory ([`DirectoryLoader`]) or an
//! in-memory fixture in tests.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::types::Timestamp;

/// Raw contents of one theme file plus its modification time.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub bytes: Vec<u8>,
    pub last_modified: Timestamp,
}

/// Reads files relative to a theme directory root.
///
/// A missing file is reported as an [`io::ErrorKind::NotFound`] error.
pub trait FileLoader: Send + Sync {
    fn load(&self, relative_path: &str) -> io::Result<LoadedFile>;

    /// Whether the file exists and is readable.
    fn exists(&self, relative_path: &str) -> bool {
        self.load(relative_path).is_ok()
    }
}

/// Loads files from a theme directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a descriptor-relative path onto the root, refusing paths that
    /// could leave the theme directory.
    fn resolve(&self, relative_path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(relative_path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative_path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Path '{relative_path}' is outside the theme directory"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl FileLoader for DirectoryLoader {
    fn load(&self, relative_path: &str) -> io::Result<LoadedFile> {
        let path = self.resolve(relative_path)?;
        let bytes = std::fs::read(&path)?;
        let modified = std::fs::metadata(&path)?.modified()?;
        Ok(LoadedFile {
            bytes,
            last_modified: Timestamp::from(modified),
        })
    }

    fn exists(&self, relative_path: &str) -> bool {
        self.resolve(relative_path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }
}
