use thiserror::Error;

use crate::types::FrameHandle;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The sensor could not provide a synchronized image and depth pair.
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// The handle was never issued, or it was already disposed or evicted.
    #[error("unknown depth frame handle {0}")]
    UnknownHandle(FrameHandle),

    #[error("invalid cache config: {0}")]
    InvalidConfig(String),

    #[error("fixture mismatch: {0}")]
    FixtureMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, CacheError>;
