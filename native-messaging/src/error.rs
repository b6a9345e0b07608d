//! Error types and handling for the launcher host.
//!
//! Every failure in the host is fatal: it is logged, surfaced through the
//! process exit status and never retried. End of stream is not an error and
//! has no variant here (see [`crate::NativeMessagingProtocol::read_message`]).

/// Result type for native messaging operations.
pub type NativeMessagingResult<T> = Result<T, NativeMessagingError>;

/// Error types for native messaging operations.
#[derive(Debug, thiserror::Error)]
pub enum NativeMessagingError {
    /// Frame-level errors (truncated prefix or payload, oversize frame,
    /// invalid UTF-8, invalid JSON)
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A required message field is absent
    #[error("Missing field '{field}' in launch message")]
    MissingField {
        /// Name of the absent field
        field: String,
    },

    /// A message field is present but has the wrong type
    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        /// Field name that failed validation
        field: String,
        /// Validation error message
        message: String,
    },

    /// The operating system refused to start the program, or it exited
    /// with a failure status within the launch grace period
    #[error("Failed to launch '{program}': {reason}")]
    LaunchFailure {
        /// Program that was being started
        program: String,
        /// What went wrong
        reason: String,
    },

    /// Caller or program rejected by the configured allow-lists
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (stdin/stdout communication)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors on the outgoing side
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NativeMessagingError {
    /// Create a malformed frame error.
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedFrame(message.into())
    }

    /// Create a missing field error.
    pub fn missing_field<S: Into<String>>(field: S) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field<S: Into<String>>(field: S, message: S) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a launch failure error.
    pub fn launch_failure<P: Into<String>, R: Into<String>>(program: P, reason: R) -> Self {
        Self::LaunchFailure {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    /// Create a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Get the error code for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedFrame(_) => "MALFORMED_FRAME",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::LaunchFailure { .. } => "LAUNCH_FAILURE",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Check if this error was caused by what the caller sent.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame(_)
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
                | Self::Forbidden(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(NativeMessagingError::malformed("short").error_code(), "MALFORMED_FRAME");
        assert_eq!(NativeMessagingError::missing_field("path").error_code(), "MISSING_FIELD");
        assert_eq!(
            NativeMessagingError::invalid_field("url", "must be a string").error_code(),
            "INVALID_FIELD"
        );
        assert_eq!(
            NativeMessagingError::launch_failure("/bin/nope", "not found").error_code(),
            "LAUNCH_FAILURE"
        );
        assert_eq!(NativeMessagingError::forbidden("origin").error_code(), "FORBIDDEN");
        assert_eq!(NativeMessagingError::config("bad").error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_error_classification() {
        assert!(NativeMessagingError::malformed("x").is_client_error());
        assert!(NativeMessagingError::missing_field("url").is_client_error());
        assert!(NativeMessagingError::forbidden("x").is_client_error());

        assert!(!NativeMessagingError::launch_failure("p", "r").is_client_error());
        assert!(!NativeMessagingError::config("x").is_client_error());
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let error = NativeMessagingError::missing_field("path");
        assert_eq!(error.to_string(), "Missing field 'path' in launch message");

        let error = NativeMessagingError::launch_failure("/usr/bin/app", "exit status: 127");
        assert!(error.to_string().contains("/usr/bin/app"));
        assert!(error.to_string().contains("127"));
    }

    #[test]
    fn test_io_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let error: NativeMessagingError = io_error.into();
        assert!(matches!(error, NativeMessagingError::Io(_)));
        assert_eq!(error.error_code(), "IO_ERROR");
    }
}
