use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::dataset::models::{DatasetResolution, FileRecord};
use crate::dataset::provider::{DatasetError, DatasetProvider};

/// Listings are informative, not exhaustive; scanning stops here.
const LISTING_CAP: usize = 50;

/// Best-effort dataset resolution over a provider. Strategies are tried in
/// priority order and the last one cannot fail: materialize, load the
/// requested tabular file, auto-detect a single CSV, list the tree.
#[derive(Clone)]
pub struct DatasetService {
    provider: Arc<dyn DatasetProvider>,
}

impl DatasetService {
    pub fn new(provider: Arc<dyn DatasetProvider>) -> Self {
        Self { provider }
    }

    pub fn resolve(
        &self,
        handle: &str,
        file_path: &str,
    ) -> Result<DatasetResolution, DatasetError> {
        info!("Processing dataset {} (requested file: {:?})", handle, file_path);

        // Materialization is the one step nothing downstream can survive
        // without.
        let root = self.provider.download(handle)?;
        info!("Dataset available at {}", root.display());

        if !file_path.is_empty() && (file_path.ends_with(".csv") || file_path.ends_with(".json")) {
            match self.provider.load_table(handle, file_path) {
                Ok(table) => return Ok(DatasetResolution::Table(table)),
                Err(err) => {
                    warn!("Tabular load of {} failed, falling back: {}", file_path, err)
                }
            }
        }

        if file_path.is_empty() {
            let csv_files = collect_csv_files(&root);
            if csv_files.len() == 1 {
                let relative = relative_to(&csv_files[0], &root);
                info!("Auto-detected single CSV: {}", relative);
                return Ok(DatasetResolution::Table(
                    self.provider.load_table(handle, &relative)?,
                ));
            }
        }

        // Image corpora and ambiguous layouts end up here: report what the
        // dataset contains instead of guessing.
        Ok(DatasetResolution::Listing(scan_files(&root, LISTING_CAP)))
    }

    /// Absolute path of a file inside a materialized dataset. Paths that do
    /// not exist, or that resolve outside the materialization root, report
    /// not-found.
    pub fn dataset_file_path(
        &self,
        handle: &str,
        relative_path: &str,
    ) -> Result<PathBuf, DatasetError> {
        let root = self.provider.download(handle)?;
        let joined = root.join(relative_path);

        let resolved = joined
            .canonicalize()
            .map_err(|_| DatasetError::FileNotFound(joined.display().to_string()))?;
        let root = root
            .canonicalize()
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;
        if !resolved.starts_with(&root) {
            return Err(DatasetError::FileNotFound(joined.display().to_string()));
        }
        Ok(resolved)
    }
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Depth-first walk, files before subdirectories, name-sorted at each level
/// so traversal order is reproducible. The visitor returns false to stop.
fn walk_files(dir: &Path, visit: &mut dyn FnMut(&Path) -> bool) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return true,
    };

    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();

    for file in files {
        if !visit(&file) {
            return false;
        }
    }
    for subdir in subdirs {
        if !walk_files(&subdir, visit) {
            return false;
        }
    }
    true
}

fn collect_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk_files(root, &mut |path| {
        if path.extension().and_then(|ext| ext.to_str()) == Some("csv") {
            found.push(path.to_path_buf());
        }
        true
    });
    found
}

fn scan_files(root: &Path, cap: usize) -> Vec<FileRecord> {
    let mut records = Vec::new();
    walk_files(root, &mut |path| {
        let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        records.push(FileRecord {
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            extension: path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default(),
            size_kb: (size as f64 / 1024.0 * 100.0).round() / 100.0,
            path: relative_to(path, root),
        });
        records.len() < cap
    });

    if records.is_empty() {
        records.push(FileRecord::empty_marker());
    }
    records
}
