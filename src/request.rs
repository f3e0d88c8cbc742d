//! Model-management request dispatch
//!
//! Maps a model action onto an HTTP method, URL, and body before any
//! network traffic, rejecting locally-invalid combinations up front.

use reqwest::Method;
use serde_json::{Value, json};

use crate::error::{ClientError, ClientResult};

/// A fully-resolved HTTP request for one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    /// Whether the response body is an NDJSON stream
    pub streamed: bool,
}

/// Closed set of model-management actions.
///
/// Streaming is only meaningful for pull/push; show, delete, and copy
/// always resolve to a single JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelAction {
    Show { verbose: bool },
    Delete,
    Copy { destination: String },
    Pull { stream: bool },
    Push { stream: bool },
}

/// Normalize a model name to `name:tag` form, defaulting the tag to
/// `latest` (e.g. `llama3` becomes `llama3:latest`).
pub fn normalize_model_name(name: &str) -> ClientResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::InvalidRequest(
            "model name cannot be empty".to_string(),
        ));
    }
    if name.contains(':') {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}:latest"))
    }
}

/// Build the request for a model action against `base_url`.
///
/// `source` is the model the action operates on; its path form is
/// percent-encoded before interpolation. A copy without a destination is
/// rejected here, before any network call.
pub fn build_model_action(
    base_url: &str,
    source: &str,
    action: &ModelAction,
) -> ClientResult<RequestSpec> {
    let source = normalize_model_name(source)?;
    let encoded = urlencoding::encode(&source);

    let spec = match action {
        ModelAction::Show { verbose } => {
            let mut url = format!("{base_url}/api/show/{encoded}");
            if *verbose {
                url.push_str("?verbose=true");
            }
            RequestSpec {
                method: Method::GET,
                url,
                body: None,
                streamed: false,
            }
        }
        ModelAction::Delete => RequestSpec {
            method: Method::DELETE,
            url: format!("{base_url}/api/models/{encoded}"),
            body: None,
            streamed: false,
        },
        ModelAction::Copy { destination } => {
            if destination.trim().is_empty() {
                return Err(ClientError::InvalidRequest(
                    "copy requires a destination model name".to_string(),
                ));
            }
            let destination = normalize_model_name(destination)?;
            RequestSpec {
                method: Method::POST,
                url: format!("{base_url}/api/models/copy"),
                body: Some(json!({ "source": source, "destination": destination })),
                streamed: false,
            }
        }
        ModelAction::Pull { stream } => RequestSpec {
            method: Method::POST,
            url: format!("{base_url}/api/models/pull"),
            body: Some(json!({ "name": source, "stream": stream })),
            streamed: *stream,
        },
        ModelAction::Push { stream } => RequestSpec {
            method: Method::POST,
            url: format!("{base_url}/api/models/push"),
            body: Some(json!({ "name": source, "stream": stream })),
            streamed: *stream,
        },
    };

    Ok(spec)
}
