use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("Malformed filter: {0}")]
    MalformedFilter(String),

    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Malformed pipeline: {0}")]
    MalformedPipeline(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
