pub mod app_config;
pub mod config;
pub mod jobs;
pub mod stores;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{JobStatus, JobType};
pub use stores::{normalize_optional_text, validate_store_name, StoreSource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid store source: {0}")]
    InvalidStoreSource(String),

    #[error("invalid job type: {0}")]
    InvalidJobType(String),

    #[error("invalid job status: {0}")]
    InvalidJobStatus(String),

    #[error("validation failed: {0}")]
    Validation(String),
}
