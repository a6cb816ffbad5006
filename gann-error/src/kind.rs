//! Error kinds for gann operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on `ErrorKind` to tell apart a transport failure from a
/// schema violation or a bad configuration. None of them is retried: any
/// error is terminal for the run that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or settings
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Inference/LLM errors
    // =========================================================================
    /// LLM inference failed or returned no structured payload
    InferenceFailed,

    /// The model's structured output did not match the expected shape
    SchemaViolation,

    /// The model call did not finish within its timeout
    Timeout,

    /// Rate limit exceeded
    RateLimited,

    /// The provider rejected the credentials
    AuthenticationFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Network error
    NetworkFailed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Inference
            ErrorKind::InferenceFailed => "InferenceFailed",
            ErrorKind::SchemaViolation => "SchemaViolation",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::NetworkFailed => "NetworkFailed",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Whether this kind originates at the model boundary
    pub fn is_invocation(&self) -> bool {
        matches!(
            self,
            ErrorKind::InferenceFailed
                | ErrorKind::SchemaViolation
                | ErrorKind::Timeout
                | ErrorKind::RateLimited
                | ErrorKind::AuthenticationFailed
                | ErrorKind::ProviderUnavailable
                | ErrorKind::NetworkFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
