//! Scoped access to a single file.
//!
//! `FileAccess` wraps open/read/write/delete for one path. Reads and writes
//! open the file on demand and always close it again before returning, so
//! callers never hold a file handle across operations. OS errors are logged
//! here and reported as [`ProfileError`] codes.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::error::ProfileError;

/// How [`FileAccess::open`] opens the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Open an existing file for reading
    Read,
    /// Create the file, or truncate it in place if it exists
    Write,
}

/// A single file on disk, opened only for the duration of one operation
#[derive(Debug, Default)]
pub struct FileAccess {
    path: Option<PathBuf>,
    extension: Option<String>,
    file: Option<File>,
}

impl FileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `new()` followed by `set_path()`
    pub fn at(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let mut access = Self::new();
        access.set_path(path)?;
        Ok(access)
    }

    /// Set the file this instance operates on.
    ///
    /// The path is made absolute. It is accepted if either the path itself or
    /// its parent directory exists, so files that are about to be created can
    /// be addressed. Directories have no extension.
    ///
    /// # Errors
    /// Returns [`ProfileError::InvalidPath`] if neither the path nor its
    /// parent exists.
    pub fn set_path(&mut self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let path = path.as_ref();
        let abs = std::path::absolute(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "Cannot resolve path");
            ProfileError::InvalidPath
        })?;

        let parent_exists = abs.parent().is_some_and(Path::exists);
        if !abs.exists() && !parent_exists {
            debug!(path = %abs.display(), "Neither path nor parent directory exists");
            return Err(ProfileError::InvalidPath);
        }

        self.close();
        self.extension = if abs.is_dir() {
            None
        } else {
            abs.extension().map(|ext| ext.to_string_lossy().into_owned())
        };
        self.path = Some(abs);
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// File extension without the leading dot, `None` for directories
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Open the file in the given mode, replacing any handle already held.
    ///
    /// # Errors
    /// Returns [`ProfileError::InvalidPath`] if no path was set and
    /// [`ProfileError::FileOpenFailed`] for any OS-level failure.
    pub fn open(&mut self, mode: FileMode) -> Result<(), ProfileError> {
        let path = self.path.as_deref().ok_or(ProfileError::InvalidPath)?;
        let opened = match mode {
            FileMode::Read => File::open(path),
            // Existing files keep their attributes, so hidden files stay
            // writable on Windows.
            FileMode::Write if path.is_file() => {
                OpenOptions::new().write(true).truncate(true).open(path)
            }
            FileMode::Write => File::create(path),
        };

        match opened {
            Ok(file) => {
                self.file = Some(file);
                Ok(())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open file");
                Err(ProfileError::FileOpenFailed)
            }
        }
    }

    /// Read the whole file. The handle is closed afterwards, also on error.
    pub fn read(&mut self) -> Result<Vec<u8>, ProfileError> {
        if self.file.is_none() {
            self.open(FileMode::Read)?;
        }

        let mut content = Vec::new();
        let result = match self.file.as_mut() {
            Some(file) => file.read_to_end(&mut content).map(|_| ()),
            None => Ok(()),
        };
        self.close();

        result.map_err(|e| self.io_failure("read", &e))?;
        Ok(content)
    }

    /// Write `content` to the file, truncating it first unless a handle is
    /// already open. The handle is closed afterwards, also on error.
    pub fn write(&mut self, content: impl AsRef<[u8]>) -> Result<(), ProfileError> {
        if self.file.is_none() {
            self.open(FileMode::Write)?;
        }

        let result = match self.file.as_mut() {
            Some(file) => file.write_all(content.as_ref()).and_then(|()| file.flush()),
            None => Ok(()),
        };
        self.close();

        result.map_err(|e| self.io_failure("write", &e))
    }

    pub fn close(&mut self) {
        self.file = None;
    }

    /// Close the file and remove it from disk if it exists.
    pub fn delete(&mut self) -> Result<(), ProfileError> {
        self.close();

        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to delete file");
            ProfileError::FileOpenFailed
        })
    }

    /// Mark the file as hidden where the platform has such an attribute.
    ///
    /// Best effort: failures are ignored and on Unix the leading dot of the
    /// file name already hides it.
    pub fn hide(&self) {
        if let Some(path) = self.path.as_deref().filter(|p| p.exists()) {
            hide_path(path);
        }
    }

    fn io_failure(&self, action: &str, err: &std::io::Error) -> ProfileError {
        let path = self.path.as_deref().unwrap_or(Path::new(""));
        error!(path = %path.display(), error = %err, "Failed to {action} file");
        ProfileError::FileOpenFailed
    }
}

#[cfg(windows)]
fn hide_path(path: &Path) {
    let status = std::process::Command::new("attrib")
        .arg("+h")
        .arg(path)
        .status();
    if let Err(e) = status {
        debug!(path = %path.display(), error = %e, "Could not hide file");
    }
}

#[cfg(not(windows))]
fn hide_path(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_path_requires_existing_parent() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::new();

        assert_eq!(
            access.set_path(temp_dir.path().join("missing/dir/file.txt")),
            Err(ProfileError::InvalidPath)
        );
        assert!(access.path().is_none());

        // The file does not exist yet but its parent does.
        access.set_path(temp_dir.path().join("new.json")).unwrap();
        assert_eq!(access.extension(), Some("json"));
        assert!(access.path().unwrap().is_absolute());
    }

    #[test]
    fn test_directory_has_no_extension() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("folder.d");
        fs::create_dir(&dir).unwrap();

        let access = FileAccess::at(&dir).unwrap();
        assert_eq!(access.extension(), None);
    }

    #[test]
    fn test_write_then_read_closes_handle() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::at(temp_dir.path().join("data.txt")).unwrap();

        access.write("hello").unwrap();
        assert!(!access.is_open());

        assert_eq!(access.read().unwrap(), b"hello");
        assert!(!access.is_open());
    }

    #[test]
    fn test_write_truncates_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::at(temp_dir.path().join("data.txt")).unwrap();

        access.write("a much longer first version").unwrap();
        access.write("short").unwrap();
        assert_eq!(access.read().unwrap(), b"short");
    }

    #[test]
    fn test_rewrite_hidden_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::at(temp_dir.path().join(".data.json")).unwrap();

        access.write("{\"type\": \"jira\", \"server\": \"https://a\"}").unwrap();
        access.hide();
        access.write("{}").unwrap();
        access.hide();
        access.write("[]").unwrap();

        assert_eq!(access.read().unwrap(), b"[]");
    }

    #[test]
    fn test_write_to_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("taken");
        fs::create_dir(&dir).unwrap();

        let mut access = FileAccess::at(&dir).unwrap();
        assert_eq!(access.write("x"), Err(ProfileError::FileOpenFailed));
        assert!(!access.is_open());
    }

    #[test]
    fn test_read_missing_file_fails_to_open() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::at(temp_dir.path().join("absent.txt")).unwrap();

        assert_eq!(access.read(), Err(ProfileError::FileOpenFailed));
        assert!(!access.is_open());
    }

    #[test]
    fn test_open_without_path() {
        let mut access = FileAccess::new();
        assert_eq!(access.open(FileMode::Read), Err(ProfileError::InvalidPath));
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("gone.txt");
        let mut access = FileAccess::at(&file).unwrap();
        access.write("x").unwrap();
        assert!(file.exists());

        access.delete().unwrap();
        assert!(!file.exists());

        // Deleting again is not an error.
        access.delete().unwrap();
    }

    #[test]
    fn test_hide_is_best_effort() {
        let temp_dir = TempDir::new().unwrap();
        let mut access = FileAccess::at(temp_dir.path().join(".hidden")).unwrap();
        access.hide();
        access.write("x").unwrap();
        access.hide();
        assert_eq!(access.read().unwrap(), b"x");
    }
}
