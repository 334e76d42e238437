//! Test utilities shared across test modules
//!
//! Every helper works inside a caller-owned temporary directory, so tests
//! never touch the real ~/.profmgr/ and can run in parallel.

use std::path::PathBuf;

use crate::paths::Paths;
use crate::store::ProfileStore;
use tempfile::TempDir;

/// Create a Paths struct rooted at a temporary "home" directory
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_home(temp_dir.path())
}

/// Open a profile store with its profiles directory in the temp directory
pub fn setup_test_store(temp_dir: &TempDir) -> ProfileStore {
    ProfileStore::open(setup_test_paths(temp_dir)).unwrap()
}

/// Write a certificate source file next to (not inside) the store
pub fn write_test_cert(temp_dir: &TempDir, file_name: &str, content: &str) -> PathBuf {
    let path = temp_dir.path().join(file_name);
    std::fs::write(&path, content).unwrap();
    path
}
