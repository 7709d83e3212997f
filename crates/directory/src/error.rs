use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The API answered with a non-success status
    #[error("{status}: {message}")]
    Api {
        status: u16,
        message: String,
        reason: Option<String>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential error: {0:#}")]
    Credential(anyhow::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Google answers 409 with reason `duplicate` for existing groups and
    /// memberships
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DirectoryError::Api { status: 409, .. })
            || matches!(self, DirectoryError::Api { reason: Some(r), .. } if r == "duplicate")
    }

    /// Decodes a Google JSON error body, falling back to the raw text
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => DirectoryError::Api {
                status,
                message: envelope.error.message,
                reason: envelope.error.errors.into_iter().find_map(|e| e.reason),
            },
            Err(_) => DirectoryError::Api {
                status,
                message: body.trim().to_string(),
                reason: None,
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_google_error_body() {
        let err = DirectoryError::from_response(
            409,
            r#"{"error":{"code":409,"message":"Entity already exists.","errors":[{"message":"Entity already exists.","domain":"global","reason":"duplicate"}]}}"#,
        );

        assert!(err.is_duplicate());
        assert_eq!(err.to_string(), "409: Entity already exists.");
    }

    #[test]
    fn test_plain_text_body() {
        let err = DirectoryError::from_response(502, "Bad Gateway\n");
        assert!(!err.is_duplicate());
        assert_eq!(err.to_string(), "502: Bad Gateway");
    }
}
