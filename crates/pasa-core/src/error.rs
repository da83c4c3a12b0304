use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source error ({source_name}): {message}")]
    Source {
        source_name: String,
        message: String,
    },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PasaError {
    pub fn from_source(source_name: &str, message: impl Into<String>) -> Self {
        PasaError::Source {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PasaError>;
