//! Error taxonomy for the translation engine.
//!
//! Per-chunk failures (provider errors, parse failures, verifier hard
//! errors) are absorbed into `TranslationState`'s quality tracking and
//! never surface as an `Err` from `RootOrchestrator::run`. Only engine
//! construction failures and internal invariant violations propagate.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type TranslationResult<T> = Result<T, TranslationError>;

/// Error kinds, matching the taxonomy in the design document.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Transport, timeout, authentication, or payload rejection from the
    /// provider gateway. Recorded at round scope; not fatal to the run.
    #[error("provider error translating chunk {chunk_index:?}: {message}")]
    Provider {
        chunk_index: Option<usize>,
        message: String,
    },

    /// A structured sub-translator response could not be decoded.
    /// Recovered locally: the raw content becomes the translation.
    #[error("failed to parse structured response for chunk {chunk_index}: {message}")]
    Parse {
        chunk_index: usize,
        message: String,
    },

    /// A verifier hard error. Never returned to the caller directly;
    /// it only ever drives repair dispatch inside the orchestrator.
    #[error("validation failed for chunk {chunk_index}: {message}")]
    Validation {
        chunk_index: usize,
        message: String,
    },

    /// Missing credentials or invalid parameters at construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal consistency failure (index out of range, invariant
    /// broken). Fatal; terminates the run with a diagnostic result.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl TranslationError {
    pub fn provider(chunk_index: Option<usize>, message: impl Into<String>) -> Self {
        Self::Provider {
            chunk_index,
            message: message.into(),
        }
    }

    pub fn parse(chunk_index: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            chunk_index,
            message: message.into(),
        }
    }

    pub fn validation(chunk_index: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            chunk_index,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }

    /// Whether this error is recoverable at round scope (i.e. should be
    /// absorbed into `QualityFlags` rather than aborting the run).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Parse { .. } | Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_is_recoverable() {
        let err = TranslationError::provider(Some(3), "timed out");
        assert!(err.is_recoverable());
    }

    #[test]
    fn invariant_violation_is_not_recoverable() {
        let err = TranslationError::invariant("chunk index out of range");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn configuration_error_is_not_recoverable() {
        let err = TranslationError::configuration("missing API key");
        assert!(!err.is_recoverable());
    }
}
