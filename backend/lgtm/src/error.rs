use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to load image from URL: {url}")]
    Load { url: String, reason: String },

    #[error("Forbidden image host: {0}")]
    ForbiddenHost(String),

    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Font unavailable: {0}")]
    Font(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Rendering task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ProcessError {
    pub fn load(url: &str, reason: impl ToString) -> Self {
        Self::Load {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure came from fetching or validating the source image.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::ForbiddenHost(_) | Self::TooLarge { .. } | Self::Decode(_)
        )
    }
}

pub type ProcessResult<T> = Result<T, ProcessError>;
