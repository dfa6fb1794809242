use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::layout::StoreError;

/// Append-only JSON-lines file used for the decision trace and the action
/// history. Single writer, no locking required.
#[derive(Debug, Clone)]
pub struct JsonlFile {
    path: PathBuf,
}

impl JsonlFile {
    /// Creates an appender over the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a JSON line.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, record)?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Reads every parseable record, skipping malformed lines.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        action: String,
        executed: bool,
    }

    #[test]
    fn appends_and_reads_back() {
        let dir = tempdir().unwrap();
        let file = JsonlFile::new(dir.path().join("history.jsonl"));
        file.append(&Row {
            action: "HOLD".into(),
            executed: true,
        })
        .unwrap();
        file.append(&Row {
            action: "UPDATE_PRICE".into(),
            executed: false,
        })
        .unwrap();
        let rows: Vec<Row> = file.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].action, "UPDATE_PRICE");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let file = JsonlFile::new(&path);
        file.append(&Row {
            action: "HOLD".into(),
            executed: true,
        })
        .unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{torn\n")
            .unwrap();
        let rows: Vec<Row> = file.read_all().unwrap();
        assert_eq!(rows.len(), 1);
    }
}
