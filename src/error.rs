//! Error types for model construction and weight loading

use thiserror::Error;

/// Main error type for vision-zoo operations
#[derive(Debug, Error)]
pub enum ModelError {
    /// The requested model name matches none of the supported architectures.
    #[error("unknown model name: {name}")]
    UnknownModel { name: String },

    /// Weight retrieval failures (hub download, cache, checkpoint files)
    #[error("weight loading error: {message}")]
    Weights { message: String },

    /// Tensor-runtime failures, propagated unchanged
    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    /// I/O failures while reading checkpoint files
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Create an unknown-model error carrying the requested name as typed
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    /// Create a weight-loading error
    pub fn weights(message: impl Into<String>) -> Self {
        Self::Weights {
            message: message.into(),
        }
    }
}

/// Result type for vision-zoo operations
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_keeps_name() {
        let err = ModelError::unknown_model("ResNet");
        assert_eq!(err.to_string(), "unknown model name: ResNet");
    }

    #[test]
    fn candle_errors_pass_through() {
        let inner = candle_core::Error::Msg("kernel failed".to_string());
        let err = ModelError::from(inner);
        assert!(err.to_string().contains("kernel failed"));
    }
}
