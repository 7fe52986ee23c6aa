use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::info;
use tar::Archive;

use crate::dataset::provider::{DatasetError, DatasetProvider};

/// HTTP client for the dataset hub. Datasets are served as gzipped tarballs
/// at `{base}/datasets/download/{owner}/{name}` and unpacked into a local
/// cache keyed by handle; a handle that is already on disk is returned
/// without touching the network.
#[derive(Clone)]
pub struct HubClient {
    base_url: String,
    token: Option<String>,
    cache_dir: PathBuf,
}

impl HubClient {
    pub fn new(base_url: String, token: Option<String>, cache_dir: PathBuf) -> Self {
        Self {
            base_url,
            token,
            cache_dir,
        }
    }

    fn dataset_dir(&self, handle: &str) -> Result<PathBuf, DatasetError> {
        // Handles are `owner/name`; reject anything that could climb out of
        // the cache directory.
        let segments: Vec<&str> = handle.split('/').collect();
        if segments.len() != 2
            || segments
                .iter()
                .any(|segment| segment.is_empty() || *segment == "." || *segment == "..")
        {
            return Err(DatasetError::Materialization(format!(
                "invalid dataset handle: {handle}"
            )));
        }
        Ok(self.cache_dir.join(segments[0]).join(segments[1]))
    }

    fn fetch_archive(&self, handle: &str) -> Result<Vec<u8>, DatasetError> {
        let url = format!(
            "{}/datasets/download/{}",
            self.base_url.trim_end_matches('/'),
            handle
        );
        info!("Downloading dataset archive from {}", url);

        // The blocking client lives and dies on the worker thread running the
        // materialization.
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;

        let mut request = http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;
        if !response.status().is_success() {
            return Err(DatasetError::Materialization(format!(
                "hub returned {} for {}",
                response.status(),
                handle
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn unpack(&self, archive: &[u8], target: &Path) -> Result<(), DatasetError> {
        let staging = target.with_extension("partial");
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .map_err(|err| DatasetError::Materialization(err.to_string()))?;
        }
        fs::create_dir_all(&staging)
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;

        Archive::new(GzDecoder::new(archive))
            .unpack(&staging)
            .map_err(|err| DatasetError::Materialization(err.to_string()))?;

        // Stage-then-rename so a torn download never looks like a cached
        // dataset. A concurrent request may have won the rename.
        if let Err(err) = fs::rename(&staging, target) {
            if target.is_dir() {
                let _ = fs::remove_dir_all(&staging);
                return Ok(());
            }
            return Err(DatasetError::Materialization(err.to_string()));
        }
        Ok(())
    }
}

impl DatasetProvider for HubClient {
    fn download(&self, handle: &str) -> Result<PathBuf, DatasetError> {
        let target = self.dataset_dir(handle)?;
        if target.is_dir() {
            return Ok(target);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| DatasetError::Materialization(err.to_string()))?;
        }

        let archive = self.fetch_archive(handle)?;
        self.unpack(&archive, &target)?;
        info!("Dataset {} materialized at {}", handle, target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn client(cache_dir: PathBuf) -> HubClient {
        HubClient::new("http://localhost:9".to_string(), None, cache_dir)
    }

    fn tarball_of(dir: &Path) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", dir).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn malformed_handles_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let hub = client(dir.path().to_path_buf());
        for handle in ["", "no-owner", "a/b/c", "../escape", "owner/..", "owner//name"] {
            assert!(
                matches!(hub.download(handle), Err(DatasetError::Materialization(_))),
                "handle {handle:?} should be rejected"
            );
        }
    }

    #[test]
    fn cached_dataset_skips_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let hub = client(dir.path().to_path_buf());
        let cached = dir.path().join("owner").join("lungset");
        fs::create_dir_all(cached.join("images")).unwrap();

        // base_url points nowhere, so this only passes via the cache.
        let root = hub.download("owner/lungset").unwrap();
        assert_eq!(root, cached);
    }

    #[test]
    fn unpack_stages_then_renames_into_place() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("train")).unwrap();
        fs::write(source.path().join("train/xray1.png"), b"img").unwrap();
        fs::write(source.path().join("labels.csv"), b"id,label\n1,Normal\n").unwrap();
        let archive = tarball_of(source.path());

        let cache = tempfile::tempdir().unwrap();
        let hub = client(cache.path().to_path_buf());
        let target = cache.path().join("owner").join("lungset");
        fs::create_dir_all(target.parent().unwrap()).unwrap();

        hub.unpack(&archive, &target).unwrap();
        assert!(target.join("train/xray1.png").is_file());
        assert!(target.join("labels.csv").is_file());
        assert!(!target.with_extension("partial").exists());
    }

    #[test]
    fn corrupt_archive_leaves_no_cached_dataset() {
        let cache = tempfile::tempdir().unwrap();
        let hub = client(cache.path().to_path_buf());
        let target = cache.path().join("owner").join("broken");
        fs::create_dir_all(target.parent().unwrap()).unwrap();

        let err = hub.unpack(b"not a tarball", &target).unwrap_err();
        assert!(matches!(err, DatasetError::Materialization(_)));
        assert!(!target.exists());
    }
}
