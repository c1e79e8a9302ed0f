//! JSONL (JSON Lines) files.
//!
//! Snapshot entry files are JSONL: one rank entry per line, in rank order.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::StorageError;

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        debug!("Wrote {} lines to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. Missing file reads as empty;
    /// unparseable lines are logged and skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();
        let mut line_num = 0;

        for line in reader.lines() {
            line_num += 1;
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!(
                        "Failed to parse line {} in {:?}: {}",
                        line_num, self.path, e
                    );
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }

    /// Count lines in the file.
    pub fn count(&self) -> Result<usize, StorageError> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestEntity {
        id: String,
        value: u32,
    }

    fn entity(id: &str, value: u32) -> TestEntity {
        TestEntity {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.jsonl");

        let entities = vec![entity("1", 100), entity("2", 200)];

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        let count = writer.write_all(&entities).unwrap();
        assert_eq!(count, 2);

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let read_entities = reader.read_all().unwrap();

        assert_eq!(read_entities, entities);
    }

    #[test]
    fn test_jsonl_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a/b/c/test.jsonl");

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        writer.write_all(&[entity("1", 1)]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_jsonl_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.jsonl");

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        assert!(reader.read_all().unwrap().is_empty());
        assert!(!reader.exists());
    }

    #[test]
    fn test_jsonl_write_all_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("overwrite.jsonl");

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);

        writer.write_all(&[entity("old", 1)]).unwrap();
        writer
            .write_all(&[entity("new1", 2), entity("new2", 3)])
            .unwrap();

        let read = reader.read_all().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].id, "new1");
    }

    #[test]
    fn test_jsonl_read_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad_lines.jsonl");

        std::fs::write(
            &path,
            "{\"id\":\"1\",\"value\":1}\nnot-valid-json\n{\"id\":\"2\",\"value\":2}\n",
        )
        .unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        let entities = reader.read_all().unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[1].id, "2");
    }

    #[test]
    fn test_jsonl_count() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("count.jsonl");

        let writer: JsonlWriter<TestEntity> = JsonlWriter::new(path.clone());
        writer
            .write_all(&[entity("1", 1), entity("2", 2), entity("3", 3)])
            .unwrap();

        let reader: JsonlReader<TestEntity> = JsonlReader::new(path);
        assert_eq!(reader.count().unwrap(), 3);
    }

    #[test]
    fn test_jsonl_count_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<TestEntity> =
            JsonlReader::new(temp_dir.path().join("missing.jsonl"));
        assert_eq!(reader.count().unwrap(), 0);
    }
}
