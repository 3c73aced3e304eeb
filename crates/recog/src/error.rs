//! Recognition errors and their retry classification.

use folio_core::retry::{classify_status, RetryClass};

/// Errors from a recognition backend invocation.
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Provider error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered 2xx but the body was not the expected shape.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    /// The input file could not be read.
    #[error("Failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl RecognitionError {
    /// Whether the engine should retry this failure.
    ///
    /// Transport failures and 429/5xx responses are transient; explicit
    /// 4xx rejections, malformed responses, and unreadable input files
    /// are permanent.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Request(_) => RetryClass::Transient,
            Self::Api { status, .. } => classify_status(*status),
            Self::InvalidResponse(_) => RetryClass::Permanent,
            Self::InputFile { .. } => RetryClass::Permanent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = RecognitionError::Api {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn rate_limits_are_transient() {
        let err = RecognitionError::Api {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(err.retry_class(), RetryClass::Transient);
    }

    #[test]
    fn client_rejections_are_permanent() {
        let err = RecognitionError::Api {
            status: 422,
            body: "unsupported image".to_string(),
        };
        assert_eq!(err.retry_class(), RetryClass::Permanent);
    }

    #[test]
    fn malformed_responses_are_permanent() {
        let err = RecognitionError::InvalidResponse("missing text field".to_string());
        assert_eq!(err.retry_class(), RetryClass::Permanent);
    }

    #[test]
    fn unreadable_input_is_permanent() {
        let err = RecognitionError::InputFile {
            path: "/data/in/missing.png".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.retry_class(), RetryClass::Permanent);
    }
}
