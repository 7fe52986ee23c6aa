use std::path::PathBuf;

use crate::dataset::models::Table;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset materialization failed: {0}")]
    Materialization(String),
    #[error("File not found in dataset: {0}")]
    FileNotFound(String),
    #[error("Tabular load failed: {0}")]
    Table(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External dataset hub. Materializes a dataset into a local directory and
/// loads tabular files out of it. Caching is the provider's concern: repeated
/// downloads of the same handle must be idempotent.
pub trait DatasetProvider: Send + Sync {
    /// Ensure the dataset is on disk and return its local root.
    fn download(&self, handle: &str) -> Result<PathBuf, DatasetError>;

    /// Load a tabular file from the materialized dataset.
    fn load_table(&self, handle: &str, relative_path: &str) -> Result<Table, DatasetError> {
        let root = self.download(handle)?;
        let path = root.join(relative_path);
        if !path.is_file() {
            return Err(DatasetError::FileNotFound(path.display().to_string()));
        }
        Table::from_path(&path)
    }
}
