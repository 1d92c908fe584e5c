use log_parser::dispatcher::{default_workers, DispatchConfig};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub workers: usize,
    pub preserve_order: bool,
    pub body_limit_mb: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            data_dir: PathBuf::from("./output"),
            workers: default_workers(),
            preserve_order: true,
            body_limit_mb: 256,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_address: var("LOG_ANALYZER_BIND").unwrap_or(defaults.bind_address),
            data_dir: var("LOG_ANALYZER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            workers: var("LOG_ANALYZER_WORKERS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.workers),
            preserve_order: defaults.preserve_order,
            body_limit_mb: var("LOG_ANALYZER_BODY_LIMIT_MB")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.body_limit_mb),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.bind_address.is_empty() {
            return Err("bind_address must not be empty".to_string());
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.body_limit_mb == 0 {
            return Err("body_limit_mb must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            preserve_order: self.preserve_order,
            ..DispatchConfig::with_workers(self.workers)
        }
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mb * 1024 * 1024
    }
}
