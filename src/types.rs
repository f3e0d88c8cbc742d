//! Wire types for the Ollama HTTP API

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::FormatMode;

/// Chat participant role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// One chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Base64-encoded images for multimodal models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            images: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            images: None,
        }
    }
}

/// Sampling and runtime options forwarded verbatim to the server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,

    /// How long the model stays resident after the request (e.g. "5m", "0")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl ModelOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
            && self.seed.is_none()
            && self.num_predict.is_none()
            && self.keep_alive.is_none()
    }
}

/// Output format constraint: the string `"json"` or an inline JSON schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatSpec {
    Name(String),
    Schema(serde_json::Value),
}

impl FormatSpec {
    /// The extraction mode this format implies.
    pub fn mode(&self) -> FormatMode {
        match self {
            FormatSpec::Name(name) if name == "json" => FormatMode::Json,
            FormatSpec::Name(_) => FormatMode::None,
            FormatSpec::Schema(_) => FormatMode::Schema,
        }
    }
}

/// Request for `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatSpec>,

    /// Conversation context returned by a previous generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    /// Bypass prompt templating
    #[serde(default)]
    pub raw: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

/// Request for `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ModelOptions>,
}

/// Request for `POST /api/models` (create)
///
/// `files` maps logical filenames to blob references; every entry must
/// point at a blob whose upload succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModelRequest {
    pub model: String,

    #[serde(rename = "from", default, skip_serializing_if = "Option::is_none")]
    pub from_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Quantization hint (e.g. "q4_K_M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,

    pub stream: bool,
}

/// Request for `POST /api/embeddings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub prompt: String,
}

/// Response for `POST /api/embeddings`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub embedding: Vec<f64>,
}

/// Non-streaming response for `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub model: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    pub response: String,
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<i64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

/// Non-streaming response for `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    pub message: Message,
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
}

/// One entry in a model listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Response for `GET /api/models` and `GET /api/running`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub models: Vec<ModelSummary>,
}

/// Response for `GET /api/version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

/// Terminal state of one operation.
///
/// Returned as a value alongside results instead of being mutated as a
/// side-channel flag; the render layer projects it onto its own
/// affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Result of driving one streaming operation to completion
#[derive(Debug, Clone)]
pub struct StreamSummary {
    pub status: OperationStatus,
    /// Records consumed from the stream
    pub records: u64,
    /// Characters handed to the render sink
    pub rendered_chars: u64,
}

/// Read a local image and base64-encode it for a multimodal request.
pub async fn encode_image(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_renames_from_and_skips_absent_fields() {
        let request = CreateModelRequest {
            model: "custom:latest".to_string(),
            from_model: Some("llama3:8b".to_string()),
            system: None,
            template: None,
            quantize: None,
            files: None,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"model": "custom:latest", "from": "llama3:8b", "stream": true})
        );
    }

    #[test]
    fn generate_request_omits_empty_options() {
        let request = GenerateRequest {
            model: "llama3:latest".to_string(),
            prompt: "hi".to_string(),
            system: None,
            template: None,
            format: None,
            context: None,
            raw: false,
            images: None,
            stream: true,
            options: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"model": "llama3:latest", "prompt": "hi", "raw": false, "stream": true})
        );
    }

    #[test]
    fn format_spec_serializes_untagged() {
        let named = FormatSpec::Name("json".to_string());
        assert_eq!(serde_json::to_value(&named).unwrap(), json!("json"));

        let schema = FormatSpec::Schema(json!({"type": "object"}));
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({"type": "object"})
        );
    }

    #[test]
    fn format_spec_mode_detection() {
        assert_eq!(FormatSpec::Name("json".to_string()).mode(), FormatMode::Json);
        assert_eq!(FormatSpec::Name("text".to_string()).mode(), FormatMode::None);
        assert_eq!(
            FormatSpec::Schema(json!({"type": "object"})).mode(),
            FormatMode::Schema
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
        assert_eq!(serde_json::to_value(Role::Tool).unwrap(), json!("tool"));
    }

    #[test]
    fn chat_response_parses_server_timestamps() {
        let response: ChatResponse = serde_json::from_value(json!({
            "model": "llama3:latest",
            "created_at": "2025-06-01T08:52:19.385406455Z",
            "message": {"role": "assistant", "content": "hello"},
            "done": true,
            "eval_count": 10
        }))
        .unwrap();
        assert!(response.created_at.is_some());
        assert_eq!(response.message.content, "hello");
    }

    #[test]
    fn model_options_is_empty_tracks_every_field() {
        assert!(ModelOptions::default().is_empty());
        let options = ModelOptions {
            keep_alive: Some("5m".to_string()),
            ..Default::default()
        };
        assert!(!options.is_empty());
    }
}
