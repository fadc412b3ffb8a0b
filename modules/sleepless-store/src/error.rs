use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table size must be positive")]
    EmptyTable,

    #[error("Corpus I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corpus record {record} is malformed ({ingested} records kept): {source}")]
    Decode {
        record: usize,
        ingested: usize,
        source: serde_json::Error,
    },

    #[error("Failed to encode post: {0}")]
    Encode(serde_json::Error),
}
