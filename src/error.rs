use thiserror::Error;

#[derive(Debug, Error)]
pub enum TomoError {
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Both center and radius must be picked before exporting patches")]
    PicksIncomplete,

    #[error("Volume has no samples")]
    EmptyVolume,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TomoError>;
