use thiserror::Error;

#[derive(Error, Debug)]
pub enum MedbotError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Other error: {0}")]
    Other(String),
}
