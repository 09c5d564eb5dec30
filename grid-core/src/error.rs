use thiserror::Error;

/// Failure kinds surfaced by the grid engine and its adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Non-positive dimensions or a grid with zero columns or rows.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Decode error or corrupt image data.
    #[error("image load failed: {0}")]
    ImageLoad(String),
    /// Drawing surface unavailable or a cell selection that no longer fits the image.
    #[error("render failed: {0}")]
    Render(String),
    /// Storage quota exceeded or a malformed project document.
    #[error("persistence failed: {0}")]
    Persistence(String),
    /// A project document missing mandatory data.
    #[error("validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, GridError>;
