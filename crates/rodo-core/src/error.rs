use thiserror::Error;

#[derive(Debug, Error)]
pub enum RodoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, RodoError>;
