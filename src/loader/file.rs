//! Loader that reads the table from a local JSON file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use super::{DataLoader, LoadError};
use crate::domain::RawRecord;

/// Reads a JSON array of row objects from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    /// Creates a loader for the given path. The file is not touched until
    /// the first fetch.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path this loader reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataLoader for JsonFileLoader {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>, LoadError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let value: Value = serde_json::from_slice(&bytes)?;
        let Value::Array(items) = value else {
            return Err(LoadError::Query(format!(
                "{} does not contain a JSON array",
                self.path.display()
            )));
        };
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(LoadError::Query(format!(
                    "row {i} is not an object: {other}"
                ))),
            })
            .collect()
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let Ok(mut file) = tempfile::NamedTempFile::new() else {
            panic!("temp file");
        };
        let Ok(()) = file.write_all(contents.as_bytes()) else {
            panic!("write temp file");
        };
        file
    }

    #[tokio::test]
    async fn reads_array_of_objects() {
        let file = write_temp(r#"[{"customer_id": "a"}, {"customer_id": "b", "Trade": "Plumber"}]"#);
        let loader = JsonFileLoader::new(file.path());

        let Ok(rows) = loader.fetch_all().await else {
            panic!("fetch should succeed");
        };
        assert_eq!(rows.len(), 2);
        assert!(loader.describe().starts_with("file:"));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let loader = JsonFileLoader::new("/nonexistent/homeowners.json");
        assert!(matches!(loader.fetch_all().await, Err(LoadError::Io(_))));
    }

    #[tokio::test]
    async fn non_array_payload_is_rejected() {
        let file = write_temp(r#"{"customer_id": "a"}"#);
        let loader = JsonFileLoader::new(file.path());
        assert!(matches!(loader.fetch_all().await, Err(LoadError::Query(_))));

        let file = write_temp("[1, 2]");
        let loader = JsonFileLoader::new(file.path());
        assert!(matches!(loader.fetch_all().await, Err(LoadError::Query(_))));

        let file = write_temp("not json");
        let loader = JsonFileLoader::new(file.path());
        assert!(matches!(loader.fetch_all().await, Err(LoadError::Decode(_))));
    }
}
