//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! The first five variants are the pipeline's user-facing taxonomy; the rest
//! wrap ambient failures from the libraries underneath.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Reference image upload failed: {0}")]
    Upload(String),

    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Image download failed: {0}")]
    Network(String),

    #[error("Could not save image: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Stable label used in request log records.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Upload(_) => "upload",
            Error::Generation(_) => "generation",
            Error::Network(_) => "network",
            Error::Persistence(_) => "persistence",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Http(_) => "http",
            Error::Image(_) => "image",
            Error::EnvVar(_) => "env",
            Error::Config(_) => "config",
            Error::Invariant(_) => "invariant",
        }
    }

    /// The single string shown to the person using the form.
    pub fn user_message(&self) -> String {
        format!("Error: {}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
