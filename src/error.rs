use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Nothing saved: {0} artifact(s) failed")]
    NothingSaved(usize),
}

impl ToolsError {
    /// Short category name used in log fields and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolsError::Io(_) => "io",
            ToolsError::Encoding(_) => "encoding",
            ToolsError::Config(_) => "config",
            ToolsError::Json(_) => "json",
            ToolsError::NothingSaved(_) => "save",
        }
    }
}

impl From<png::EncodingError> for ToolsError {
    fn from(e: png::EncodingError) -> Self {
        match e {
            png::EncodingError::IoError(io) => ToolsError::Io(io),
            other => ToolsError::Encoding(other.to_string()),
        }
    }
}

impl From<png::DecodingError> for ToolsError {
    fn from(e: png::DecodingError) -> Self {
        match e {
            png::DecodingError::IoError(io) => ToolsError::Io(io),
            other => ToolsError::Encoding(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ToolsError>;
