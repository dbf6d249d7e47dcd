#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use zip::{ZipWriter, write::SimpleFileOptions};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Reads a CSV written by the pipeline into a header row and data rows.
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open output csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (headers, rows)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Packs `entries` (archive path, contents) into a zip under the
    /// workspace and returns its path.
    pub fn write_zip(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let file = File::create(&path).expect("create zip");
        let mut zip = ZipWriter::new(file);
        for (entry, contents) in entries {
            zip.start_file(*entry, SimpleFileOptions::default())
                .expect("start zip entry");
            zip.write_all(contents.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip");
        path
    }

    /// Copies a fixture into the workspace.
    pub fn copy_fixture(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::copy(fixture_path(name), &path).expect("copy fixture");
        path
    }
}
