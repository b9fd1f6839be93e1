//! Error type shared by every engine

use std::io;

/// Result type used throughout the engines
pub type EngineResult<T> = Result<T, EngineError>;

/// Error types for engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The underlying byte source failed
    #[error("failed to read sequence source: {0}")]
    SourceRead(#[from] io::Error),

    /// A parameter was rejected before any work started
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// A pipeline thread could not be started
    #[error("failed to spawn pipeline thread: {0}")]
    Spawn(#[source] io::Error),
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidParameter`]
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Whether this error reports a caller-initiated stop rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts_to_source_read() {
        let err: EngineError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, EngineError::SourceRead(_)));
        assert!(!err.is_cancelled());
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(EngineError::Cancelled.is_cancelled());

        let err = EngineError::invalid("window_size", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "invalid parameter `window_size`: must be greater than zero"
        );
    }
}
