//! Error handling for Strata
//!
//! Errors only ever surface on the control side (engine preparation, sample
//! loading, parameter writes by name). The audio callback has no error path:
//! anything that goes wrong there degrades to silence.

use thiserror::Error;

/// Result type alias for Strata operations
pub type Result<T> = std::result::Result<T, StrataError>;

/// Main error type for Strata operations
#[derive(Error, Debug)]
pub enum StrataError {
    // File Errors
    #[error("File not found: {path}")]
    FileNotFound {
        path: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio contains no samples")]
    EmptyAudio,

    // Engine Errors
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Out of memory: {details}")]
    OutOfMemory { details: String },

    #[error("Sample queue full: the audio thread has not picked up the previous sample yet")]
    SampleQueueFull,

    // Parameter Errors
    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Invalid value for {name}: expected {expected}, got {found}")]
    InvalidParameterValue {
        name: String,
        expected: &'static str,
        found: String,
    },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StrataError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StrataError::FileNotFound { .. } => "FILE_NOT_FOUND",
            StrataError::InvalidAudio { .. } => "INVALID_AUDIO",
            StrataError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            StrataError::EmptyAudio => "EMPTY_AUDIO",
            StrataError::InvalidConfig { .. } => "INVALID_CONFIG",
            StrataError::OutOfMemory { .. } => "OUT_OF_MEMORY",
            StrataError::SampleQueueFull => "SAMPLE_QUEUE_FULL",
            StrataError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            StrataError::InvalidParameterValue { .. } => "INVALID_PARAMETER_VALUE",
            StrataError::Io(_) => "IO_ERROR",
            StrataError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the engine playable: a failed sample load
    /// just means the sampler layer stays silent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StrataError::FileNotFound { .. }
                | StrataError::InvalidAudio { .. }
                | StrataError::UnsupportedFormat { .. }
                | StrataError::EmptyAudio
                | StrataError::SampleQueueFull
                | StrataError::UnknownParameter { .. }
                | StrataError::InvalidParameterValue { .. }
        )
    }
}
