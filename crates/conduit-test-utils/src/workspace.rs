//! [`TestWorkspace`] builder for conduit test scenarios.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory holding a data dir, source files and target
/// directories, with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use conduit_test_utils::TestWorkspace;
/// use serde_json::json;
///
/// let ws = TestWorkspace::new();
/// let source = ws.write_source("people.json", &json!([{"id": 1}]));
/// assert!(source.exists());
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("TestWorkspace::new: failed to create temp dir"),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The record store directory (`<root>/data`), created on first use.
    pub fn data_dir(&self) -> PathBuf {
        let dir = self.root().join("data");
        fs::create_dir_all(&dir).expect("TestWorkspace::data_dir: failed to create data dir");
        dir
    }

    /// Write `value` as JSON to `<root>/sources/<name>` and return the path.
    pub fn write_source(&self, name: &str, value: &Value) -> PathBuf {
        let path = self.root().join("sources").join(name);
        self.write_file(
            &path,
            &serde_json::to_string_pretty(value).expect("source value serializes"),
        );
        path
    }

    /// Path of a target directory under `<root>/targets` (not created).
    pub fn target_dir(&self, name: &str) -> PathBuf {
        self.root().join("targets").join(name)
    }

    /// All JSON objects in a target directory, sorted by file name.
    pub fn target_objects(&self, name: &str) -> Vec<Value> {
        let dir = self.target_dir(name);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|path| {
                let content = fs::read_to_string(path).expect("target file readable");
                serde_json::from_str(&content).expect("target file is JSON")
            })
            .collect()
    }

    /// Write a file, creating parent directories.
    pub fn write_file(&self, path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("TestWorkspace::write_file: failed to create dir");
        }
        fs::write(path, content).expect("TestWorkspace::write_file: failed to write");
    }

    /// Assert that a path relative to the root exists.
    pub fn assert_file_exists(&self, relative: &str) {
        let path = self.root().join(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }
}
