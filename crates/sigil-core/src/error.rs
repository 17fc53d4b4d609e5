use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Name not found: {0}")]
    NameNotFound(String),

    #[error("Malformed index entry '{name}': {message}")]
    MalformedIndexEntry { name: String, message: String },

    #[error("Symbol file not found or unreadable: {0}")]
    SymbolFileNotFound(String),

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Resolution attempted against a null module base")]
    InvalidBase,

    #[error("Duplicate name after flattening: {0}")]
    DuplicateName(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Failed to read memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means the requested name simply does not exist,
    /// as opposed to a structural failure (bad file, bad pattern, bad base).
    pub fn is_name_not_found(&self) -> bool {
        matches!(self, Error::NameNotFound(_))
    }
}
