//! Error types for voicegate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VadError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Model errors
    #[error("Model fetch failed: {message}")]
    ModelFetch { message: String },

    #[error("Model load failed: {message}")]
    ModelLoad { message: String },

    #[error("Inference failed: {message}")]
    Inference { message: String },

    // Lifecycle errors
    #[error("Engine has been released")]
    Released,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VadError>;
