//! Session-facing error type.

use crate::config::ConfigError;
use crate::image::ImageId;
use crate::palette::ExtractError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors surfaced by board operations. None of them end the session.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not a valid image URL: {0}")]
    InvalidImageUrl(String),
    #[error("Image not found: {0}")]
    NotFound(ImageId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;
