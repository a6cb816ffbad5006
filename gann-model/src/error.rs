//! Model boundary error helpers
//!
//! Re-exports gann-error and maps provider failures onto it.

pub use gann_error::{Error, ErrorKind, Result};

use crate::provider::ProviderError;

/// Convert a provider failure into a gann [`Error`], keeping it as the source
pub fn provider_error(err: ProviderError) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::ModelNotFound(_) => ErrorKind::ConfigInvalid,
        ProviderError::Api { status, .. } if *status >= 500 => ErrorKind::ProviderUnavailable,
        ProviderError::Api { .. } | ProviderError::Parse(_) | ProviderError::Other(_) => {
            ErrorKind::InferenceFailed
        }
    };

    let mut error = Error::new(kind, err.to_string());
    if let ProviderError::Api { status, .. } = &err {
        error = error.with_context("status", status.to_string());
    }
    error.set_source(err)
}

/// Create a SchemaViolation error
pub fn schema_violation(field: impl Into<String>, reason: impl Into<String>) -> Error {
    Error::schema_violation(field, reason)
}

/// Create an InferenceFailed error for a response with no structured payload
pub fn missing_payload(model: impl Into<String>) -> Error {
    Error::inference_failed("no structured response from model invocation")
        .with_context("model", model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_kinds() {
        let err = provider_error(ProviderError::Network("connection refused".into()));
        assert_eq!(err.kind(), ErrorKind::NetworkFailed);
        assert!(err.source_ref().is_some());

        let err = provider_error(ProviderError::RateLimited { retry_after: None });
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = provider_error(ProviderError::Api { status: 503, message: "down".into() });
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
        assert_eq!(err.context_value("status"), Some("503"));

        let err = provider_error(ProviderError::Api { status: 400, message: "bad".into() });
        assert_eq!(err.kind(), ErrorKind::InferenceFailed);

        let err = provider_error(ProviderError::ModelNotFound("gpt-9".into()));
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }
}
