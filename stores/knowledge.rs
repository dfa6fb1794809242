use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::layout::StoreError;

const FILE_HEADER: &str = "# Vela Knowledge Base\n\n\
> Long-term business wisdom distilled from experience.\n\
> The decision engine reads the tail of this file before every decision.\n";

/// Fallback wisdom returned when the knowledge base does not exist yet.
pub const NO_WISDOM: &str =
    "No prior wisdom available. This is a fresh start - proceed with caution.";

/// Append-only wisdom file. Single writer (the memory consolidator);
/// truncation happens only on the read side.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    /// Creates a store over the given Markdown path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one consolidation block, writing the file header on first use.
    pub fn append_block(&self, block: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let fresh = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh {
            file.write_all(FILE_HEADER.as_bytes())?;
        }
        file.write_all(block.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Most recent wisdom, truncated to at most `max_chars` characters.
    ///
    /// Older entries are dropped from the front; a marker notes the cut.
    pub fn tail(&self, max_chars: usize) -> Result<String, StoreError> {
        if !self.path.exists() {
            return Ok(NO_WISDOM.to_string());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok("Knowledge base is empty. No prior experience to draw from.".to_string());
        }
        if content.chars().count() <= max_chars {
            return Ok(content);
        }
        let tail: String = content
            .chars()
            .skip(content.chars().count() - max_chars)
            .collect();
        Ok(format!("...[older entries truncated]...\n\n{tail}"))
    }

    /// Number of consolidation blocks present.
    pub fn block_count(&self) -> Result<usize, StoreError> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter(|line| line.starts_with("### Consolidated"))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_fresh_start() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("kb.md"));
        assert_eq!(store.tail(500).unwrap(), NO_WISDOM);
        assert_eq!(store.block_count().unwrap(), 0);
    }

    #[test]
    fn appends_header_once_then_blocks() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("kb.md"));
        store
            .append_block("\n---\n\n### Consolidated on 2026-08-01 10:00\n- rule one\n")
            .unwrap();
        store
            .append_block("\n---\n\n### Consolidated on 2026-08-08 10:00\n- rule two\n")
            .unwrap();
        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.matches("# Vela Knowledge Base").count(), 1);
        assert_eq!(store.block_count().unwrap(), 2);
    }

    #[test]
    fn tail_truncates_front() {
        let dir = tempdir().unwrap();
        let store = KnowledgeStore::new(dir.path().join("kb.md"));
        store.append_block(&"x".repeat(4000)).unwrap();
        let tail = store.tail(100).unwrap();
        assert!(tail.starts_with("...[older entries truncated]..."));
        assert!(tail.len() < 200);
    }
}
