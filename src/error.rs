//! Client error types and HTTP error mapping

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Client error taxonomy
///
/// Submission-level failures (transport, upload) always surface to the
/// caller. Per-record conditions of incremental parsing are recovered in
/// place by the stream and extraction layers and never appear here.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP call failed or the server answered with a non-2xx status
    #[error("{message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("failed to connect to Ollama server at {url}; is it running?")]
    Connect { url: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// A blob upload was rejected; the enclosing model-creation submission
    /// must not proceed
    #[error("blob upload {reference} rejected with HTTP {status}")]
    Upload { reference: String, status: u16 },

    /// Rejected locally, before any network call
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Map a non-2xx response to a [`ClientError::Transport`].
///
/// The message is taken from the body's `error` field when the body is a
/// JSON object carrying one, otherwise `fallback` names the failed
/// operation.
pub(crate) fn map_http_status(
    status: reqwest::StatusCode,
    body: &str,
    fallback: &str,
) -> ClientError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
        .unwrap_or_else(|| format!("{fallback} (HTTP {status})"));

    ClientError::Transport {
        status: Some(status.as_u16()),
        message,
    }
}

/// Map a [`reqwest::Error`] into the client taxonomy.
pub(crate) fn map_reqwest_error(err: reqwest::Error, url: &str) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_connect() {
        ClientError::Connect {
            url: url.to_string(),
        }
    } else {
        ClientError::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_in_body_becomes_message() {
        let err = map_http_status(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"model 'foo' not found"}"#,
            "Failed to show model",
        );
        assert!(matches!(
            err,
            ClientError::Transport { status: Some(404), message } if message == "model 'foo' not found"
        ));
    }

    #[test]
    fn non_json_body_falls_back_to_operation_message() {
        let err = map_http_status(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "<html>oops</html>",
            "Failed to generate completion",
        );
        match err {
            ClientError::Transport { status, message } => {
                assert_eq!(status, Some(500));
                assert!(message.contains("Failed to generate completion"));
                assert!(message.contains("500"), "expected status in message: {message}");
            }
            other => panic!("expected Transport, got: {other:?}"),
        }
    }

    #[test]
    fn json_body_without_error_field_falls_back() {
        let err = map_http_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"nope"}"#,
            "Failed to copy model",
        );
        assert!(matches!(
            err,
            ClientError::Transport { message, .. } if message.contains("Failed to copy model")
        ));
    }

    #[test]
    fn empty_body_falls_back() {
        let err = map_http_status(reqwest::StatusCode::BAD_GATEWAY, "", "Failed to pull model");
        assert!(matches!(
            err,
            ClientError::Transport { status: Some(502), .. }
        ));
    }

    #[test]
    fn upload_error_names_reference_and_status() {
        let err = ClientError::Upload {
            reference: "sha256:abc".to_string(),
            status: 400,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("sha256:abc"));
        assert!(rendered.contains("400"));
    }
}
