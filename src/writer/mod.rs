//! Output sinks for generated files.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Destination for generated files. Shared by all package units.
pub trait Sink: Send + Sync {
    fn write(&self, name: &str, data: &[u8]) -> Result<(), SinkError>;
}

/// Writes each file into a directory, replacing existing files
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Create the sink, creating `dir` and its parents if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SinkError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }
}

impl Sink for FileSink {
    fn write(&self, name: &str, data: &[u8]) -> Result<(), SinkError> {
        let path = self.dir.join(name);
        fs::write(&path, data).map_err(|source| SinkError::Write {
            name: name.to_string(),
            source,
        })?;
        info!(path = %path.display(), bytes = data.len(), "Wrote client");
        Ok(())
    }
}

/// Prints every file to standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, name: &str, data: &[u8]) -> Result<(), SinkError> {
        let to_err = |source| SinkError::Write {
            name: name.to_string(),
            source,
        };
        // the lock keeps concurrent files from interleaving
        let mut out = io::stdout().lock();
        out.write_all(data).map_err(to_err)?;
        out.flush().map_err(to_err)?;
        debug!(file = name, bytes = data.len(), "Printed client");
        Ok(())
    }
}

/// Keeps files in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the files written so far
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Content of the file called `name`, if written
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.clone())
    }
}

impl Sink for MemorySink {
    fn write(&self, name: &str, data: &[u8]) -> Result<(), SinkError> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((name.to_string(), data.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_sink_creates_directory_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("client");
        let sink = FileSink::new(&dir).unwrap();
        assert!(dir.is_dir());

        sink.write("generated_MathClient.go", b"first").unwrap();
        sink.write("generated_MathClient.go", b"second").unwrap();

        let content = fs::read_to_string(dir.join("generated_MathClient.go")).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_file_sink_fails_when_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("client");
        fs::write(&blocker, "not a directory").unwrap();

        let result = FileSink::new(&blocker);
        assert!(matches!(result, Err(SinkError::CreateDir { .. })));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.write("a.go", b"a").unwrap();
        sink.write("b.go", b"b").unwrap();

        let names: Vec<String> = sink.files().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.go", "b.go"]);
        assert_eq!(sink.get("b.go"), Some(b"b".to_vec()));
        assert_eq!(sink.get("c.go"), None);
    }
}
