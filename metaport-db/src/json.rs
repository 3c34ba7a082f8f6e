use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{DbError, DbResult};
use crate::pg::is_collection_name;
use crate::store::LegacySource;

/// Reads each legacy collection from `<dir>/<collection>.json`, a JSON array of rows.
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl LegacySource for JsonDirSource {
    async fn list(&self, collection: &str) -> DbResult<Vec<Value>> {
        if !is_collection_name(collection) {
            return Err(DbError::InvalidCollection(collection.to_string()));
        }
        let path = self.dir.join(format!("{collection}.json"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("legacy collection {} not present in {}", collection, self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }
}
