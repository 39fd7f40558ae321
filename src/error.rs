//! Error types for the subtitles core
//!
//! Decode failures live in [`DecodeError`] so the protocol layer stays
//! independent of the dispatcher. Everything else is a [`SubtitlesError`].

use thiserror::Error;

/// Failures while turning a raw JSON object into a typed command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Content is not valid JSON, or not a JSON object
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),

    /// A required field is absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong JSON type
    #[error("Invalid type for field {field}: expected {expected}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },

    /// An enum-coded field carries a value outside its range
    #[error("Invalid value {value} for field {field}")]
    InvalidEnum { field: &'static str, value: i64 },

    /// A key the decoder does not know, only reported in strict mode
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// `cmdType` outside the known command set
    #[error("Unknown command type: {0}")]
    UnknownCommand(i64),
}

/// Errors surfaced by the subtitles core
#[derive(Error, Debug, Clone)]
pub enum SubtitlesError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A chunk arrived for a message that was already finalized
    #[error("Write to sealed message {message_id}")]
    SealedAccumulatorWrite { message_id: String },

    /// A registered handler returned an error or panicked
    #[error("Listener {listener} failed: {cause}")]
    ListenerCallbackFailure { listener: u64, cause: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for SubtitlesError {
    fn from(e: std::io::Error) -> Self {
        SubtitlesError::IOError(e.to_string())
    }
}

impl SubtitlesError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors cost at most one event; the dispatcher keeps running.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SubtitlesError::Decode(_) => true,
            SubtitlesError::SealedAccumulatorWrite { .. } => true,
            SubtitlesError::ListenerCallbackFailure { .. } => true,
            SubtitlesError::ConfigError(_) => false,
            SubtitlesError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            SubtitlesError::Decode(_) => {
                "Received a subtitle message that could not be understood.".to_string()
            }
            SubtitlesError::SealedAccumulatorWrite { .. } => {
                "Ignored an update to a finished subtitle line.".to_string()
            }
            SubtitlesError::ListenerCallbackFailure { .. } => {
                "A subtitle display failed to update.".to_string()
            }
            SubtitlesError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            SubtitlesError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

/// Result type alias for subtitles operations
pub type Result<T> = std::result::Result<T, SubtitlesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_converts() {
        let err: SubtitlesError = DecodeError::MissingField("text").into();
        assert!(matches!(
            err,
            SubtitlesError::Decode(DecodeError::MissingField("text"))
        ));
        assert_eq!(err.to_string(), "Decode error: Missing field: text");
    }

    #[test]
    fn test_recoverability() {
        assert!(SubtitlesError::SealedAccumulatorWrite {
            message_id: "m1".to_string()
        }
        .is_recoverable());
        assert!(!SubtitlesError::ConfigError("bad".to_string()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SubtitlesError = io.into();
        assert!(matches!(err, SubtitlesError::IOError(_)));
        assert!(!err.user_message().is_empty());
    }
}
