//! Core error types for roundkit-core.
//!
//! Input classification problems are never errors: a tap that matches
//! nothing is an [`Outcome`](crate::input::Outcome). The types here cover
//! configuration, target generation, result reporting and misuse of the
//! engine API.

use std::path::PathBuf;
use thiserror::Error;

use crate::round::Phase;

/// Core error type for roundkit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Target generation failed; the round did not start
    #[error("Target generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Result reporting errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// An engine command was issued in a phase that does not accept it
    #[error("Cannot {operation} while in phase {phase:?}")]
    InvalidTransition {
        phase: Phase,
        operation: &'static str,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Dot-path key that does not exist in the configuration
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// No game preset with this id
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Target generation errors.
///
/// Exhausting the rejection-sampling budget is not one of them: the
/// generator accepts an overlapping sample instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Target of size {size} does not fit a {width}x{height} playfield")]
    PlayfieldTooSmall { size: f64, width: f64, height: f64 },

    #[error("Matching layout has no categories")]
    NoCategories,

    #[error("Matching layout has no category other than {0} for distractors")]
    NoDistractorCategory(String),

    #[error("Layout requests no targets")]
    NoTargets,
}

/// Errors from submitting a session result to the stats API.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stats API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid stats API endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Errors raised by a feedback sink (audio, haptics, speech).
///
/// The feedback coordinator logs and swallows these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("Feedback channel unavailable: {0}")]
    Unavailable(String),

    #[error("Feedback playback failed: {0}")]
    Failed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
