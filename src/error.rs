//! Error types for the rPPG pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type RppgResult<T> = Result<T, RppgError>;

/// Errors produced by the rPPG estimation pipeline.
#[derive(Error, Debug)]
pub enum RppgError {
    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Initial recurrent-state document could not be loaded
    #[error("Failed to load initial state: {0}")]
    StateLoad(String),

    /// A model invocation failed at runtime
    #[error("Model execution failed: {0}")]
    Model(String),

    /// Shape mismatch error
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        actual: Vec<usize>,
    },

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// ONNX Runtime error
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RppgError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RppgError::Config(msg.into())
    }

    /// Create a state-load error
    pub fn state_load<S: Into<String>>(msg: S) -> Self {
        RppgError::StateLoad(msg.into())
    }

    /// Create a model execution error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        RppgError::Model(msg.into())
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: Vec<usize>, actual: Vec<usize>) -> Self {
        RppgError::ShapeMismatch { expected, actual }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        RppgError::InvalidInput(msg.into())
    }
}
