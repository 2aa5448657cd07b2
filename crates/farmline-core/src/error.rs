//! Error types for farmline-core.

use thiserror::Error;

use crate::menu::{Language, Prompt};

/// Result type alias using farmline-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for farmline operations
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (startup-fatal, never per-request)
    #[error("Missing menu template for {prompt:?} in language {language:?}")]
    MissingTemplate { prompt: Prompt, language: Language },

    // Price dataset errors, carrying the failing path for the log line
    #[error("Price data error: {0}")]
    PriceData(String),
}
