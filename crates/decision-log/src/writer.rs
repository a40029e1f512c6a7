use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::entry::DecisionEntry;

#[derive(Debug, thiserror::Error)]
pub enum DecisionLogError {
    #[error("failed to create parent directories for {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open decision log {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize decision entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write to decision log: {0}")]
    Write(#[source] std::io::Error),
}

/// Append-only writer producing one JSON line per [`DecisionEntry`].
pub struct DecisionWriter {
    path: PathBuf,
    file: File,
}

impl DecisionWriter {
    /// Open (or create) the log at `path` in append mode, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecisionLogError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DecisionLogError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| DecisionLogError::OpenFile {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "decision log opened");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialise `entry` and append it as a single line.
    ///
    /// The line is written with one `write_all` so concurrent appenders never
    /// interleave within an entry.
    pub fn write(&mut self, entry: &DecisionEntry) -> Result<(), DecisionLogError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        self.file.write_all(&line).map_err(DecisionLogError::Write)?;
        self.file.flush().map_err(DecisionLogError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{DecisionEventType, DecisionSource};

    fn entry(component: &str) -> DecisionEntry {
        DecisionEntry::new(
            DecisionEventType::PolicySetLoaded,
            DecisionSource::new(component),
            serde_json::json!({"policies": 1}),
        )
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/decisions.jsonl");

        let mut writer = DecisionWriter::open(&path).unwrap();
        writer.write(&entry("validate")).unwrap();

        assert!(path.exists());
        assert_eq!(writer.path(), path.as_path());
    }

    #[test]
    fn appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");

        {
            let mut writer = DecisionWriter::open(&path).unwrap();
            writer.write(&entry("validate")).unwrap();
            writer.write(&entry("evaluate")).unwrap();
        }
        // Reopening appends rather than truncating.
        DecisionWriter::open(&path)
            .unwrap()
            .write(&entry("test"))
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<DecisionEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let components: Vec<_> = parsed.iter().map(|e| e.source.component.as_str()).collect();
        assert_eq!(components, ["validate", "evaluate", "test"]);
        assert!(contents.ends_with('\n'));
    }

    #[test]
    fn open_fails_on_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = DecisionWriter::open(dir.path()).err().unwrap();
        assert!(matches!(err, DecisionLogError::OpenFile { .. }));
    }
}
