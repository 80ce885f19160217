use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid step identifier: {0}")]
    InvalidStepId(String),

    #[error("step catalog not found: {0}")]
    CatalogNotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
