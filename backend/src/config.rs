use std::env;
use std::path::PathBuf;

/// Runtime settings, sourced from the environment (a .env file is honored).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: String,
    pub hub_base_url: String,
    pub hub_token: Option<String>,
    pub dataset_cache_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());

        let hub_base_url = env::var("DATASET_HUB_URL")
            .unwrap_or_else(|_| "http://localhost:9090/api/v1".to_string());
        let hub_token = env::var("DATASET_HUB_TOKEN").ok();

        let dataset_cache_dir = if let Ok(dir) = env::var("DATASET_CACHE_DIR") {
            PathBuf::from(dir)
        } else if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".cache").join("lung-datasets")
        } else {
            PathBuf::from("dataset_cache")
        };

        Self {
            port,
            hub_base_url,
            hub_token,
            dataset_cache_dir,
        }
    }
}
