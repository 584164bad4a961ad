//! LanceDB connection wrapper.
//!
//! One LanceDB directory holds every collection; a collection is a table.

use std::path::{Path, PathBuf};

/// LanceDB connection rooted at a filesystem path.
pub struct LanceVectorStore {
    db: lancedb::Connection,
    base_path: PathBuf,
}

impl LanceVectorStore {
    /// Open or create a LanceDB store at `base_path`, creating the directory
    /// if needed.
    pub async fn new(base_path: PathBuf) -> Result<Self, lancedb::Error> {
        std::fs::create_dir_all(&base_path).map_err(|e| lancedb::Error::CreateDir {
            path: base_path.display().to_string(),
            source: e,
        })?;

        let uri = base_path
            .to_str()
            .ok_or_else(|| lancedb::Error::InvalidInput {
                message: format!("Path contains invalid UTF-8: {}", base_path.display()),
            })?;

        let db = lancedb::connect(uri).execute().await?;

        Ok(Self { db, base_path })
    }

    /// Open a collection. `Ok(None)` when it does not exist.
    pub async fn open_table(&self, name: &str) -> Result<Option<lancedb::Table>, lancedb::Error> {
        match self.db.open_table(name).execute().await {
            Ok(table) => Ok(Some(table)),
            Err(lancedb::Error::TableNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn table_names(&self) -> Result<Vec<String>, lancedb::Error> {
        self.db.table_names().execute().await
    }

    pub fn connection(&self) -> &lancedb::Connection {
        &self.db
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// `{data_dir}/vector_store`
pub fn default_vector_path(data_dir: &Path) -> PathBuf {
    data_dir.join("vector_store")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_opens_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::new(temp_dir.path().join("vectors"))
            .await
            .unwrap();

        assert!(store.table_names().await.unwrap().is_empty());
        assert!(store.base_path().exists());
    }

    #[tokio::test]
    async fn test_open_missing_table_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LanceVectorStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap();

        assert!(store.open_table("documents").await.unwrap().is_none());
    }
}
