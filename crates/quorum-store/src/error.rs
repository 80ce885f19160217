use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no results for query")]
    NoResults,

    #[error("store lock poisoned")]
    Poisoned,

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("json column error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp column error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("{0}")]
    Other(String),
}
