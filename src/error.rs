use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RobustnessError {
    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Cannot enumerate directory {path}: {source}")]
    Enumeration {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fingerprint length mismatch: {left} bits vs {right} bits")]
    FingerprintMismatch { left: u32, right: u32 },

    #[error("Invalid catalogue: {0}")]
    InvalidCatalogue(String),

    #[error("Unknown manipulation: {0}")]
    UnknownManipulation(String),

    #[error("Image too small for fingerprinting (minimum: {0}x{0})")]
    ImageTooSmall(u32),
}

pub type Result<T> = std::result::Result<T, RobustnessError>;
