//! HTTP client for the Ollama API
//!
//! One [`Client`] owns a shared `reqwest::Client` and drives every
//! operation of the API surface: generation and chat (streamed or not),
//! embeddings, model listings, model-management actions, and
//! content-addressed blob uploads feeding model creation.
//!
//! Streaming operations take a render sink — a plain callback receiving
//! each extracted fragment in arrival order. The sink owns its display
//! surface; concurrent operations on independent sinks may interleave
//! freely, but within one stream ordering is strict and nothing is
//! buffered ahead of the next line boundary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::blob::{self, BlobDescriptor};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, map_http_status, map_reqwest_error};
use crate::extract::{FormatMode, OperationKind, extract};
use crate::limit::RateLimiter;
use crate::request::{ModelAction, RequestSpec, build_model_action, normalize_model_name};
use crate::stream::record_stream;
use crate::types::{
    ChatRequest, ChatResponse, CreateModelRequest, EmbeddingsRequest, EmbeddingsResponse,
    GenerateRequest, GenerateResponse, ModelList, OperationStatus, StreamSummary, VersionInfo,
};

/// Default Ollama API base URL
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Client for an Ollama-compatible API server
pub struct Client {
    base_url: String,
    http: reqwest::Client,
    limiter: Option<RateLimiter>,
}

impl Client {
    /// Create a client with defaults: local server, no rate limiting.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
            limiter: None,
        }
    }

    /// Build a client from configuration (timeouts, base URL, rate limits).
    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.normalized_base_url(),
            http,
            limiter: config
                .rate_limit
                .as_ref()
                .map(|rl| RateLimiter::new(rl.requests_per_second, rl.burst)),
        })
    }

    /// Override the API base URL (useful against a mock or remote server).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue a request, returning the response once the status is 2xx.
    async fn send(&self, spec: RequestSpec, fallback: &str) -> ClientResult<reqwest::Response> {
        let endpoint = spec
            .url
            .strip_prefix(&self.base_url)
            .unwrap_or(&spec.url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        if let Some(limiter) = &self.limiter {
            limiter.acquire(&endpoint).await;
        }
        crate::metrics::record_request(&endpoint);

        tracing::debug!(method = %spec.method, url = %spec.url, streamed = spec.streamed, "sending request");

        let mut request = self.http.request(spec.method.clone(), &spec.url);
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, &spec.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_status(status, &body, fallback));
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> ClientResult<T> {
        let spec = RequestSpec {
            method: Method::GET,
            url: self.url(path),
            body: None,
            streamed: false,
        };
        self.parse_response(self.send(spec, fallback).await?, path)
            .await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Value,
        fallback: &str,
    ) -> ClientResult<T> {
        let spec = RequestSpec {
            method: Method::POST,
            url: self.url(path),
            body: Some(body),
            streamed: false,
        };
        self.parse_response(self.send(spec, fallback).await?, path)
            .await
    }

    async fn parse_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        url: &str,
    ) -> ClientResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, url))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// `GET /api/version`
    pub async fn version(&self) -> ClientResult<VersionInfo> {
        self.get_json("/api/version", "Failed to get version").await
    }

    /// `GET /api/models`
    pub async fn list_models(&self) -> ClientResult<ModelList> {
        self.get_json("/api/models", "Failed to list models").await
    }

    /// `GET /api/running`
    pub async fn list_running(&self) -> ClientResult<ModelList> {
        self.get_json("/api/running", "Failed to list running models")
            .await
    }

    /// `POST /api/embeddings`
    pub async fn embeddings(&self, request: &EmbeddingsRequest) -> ClientResult<EmbeddingsResponse> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        self.post_json(
            "/api/embeddings",
            serde_json::to_value(&request)?,
            "Failed to generate embeddings",
        )
        .await
    }

    /// Non-streaming completion: `POST /api/generate` with `stream: false`.
    pub async fn generate(&self, request: &GenerateRequest) -> ClientResult<GenerateResponse> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        request.stream = false;
        self.post_json(
            "/api/generate",
            serde_json::to_value(&request)?,
            "Failed to generate completion",
        )
        .await
    }

    /// Streaming completion; `sink` receives each extracted fragment in
    /// arrival order.
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
        sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        request.stream = true;
        let mode = request.format.as_ref().map(|f| f.mode()).unwrap_or_default();

        let spec = RequestSpec {
            method: Method::POST,
            url: self.url("/api/generate"),
            body: Some(serde_json::to_value(&request)?),
            streamed: true,
        };
        let response = self.send(spec, "Failed to generate completion").await?;
        self.drive_stream(response, OperationKind::Generate, mode, sink)
            .await
    }

    /// Non-streaming chat completion: `POST /api/chat` with `stream: false`.
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatResponse> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        request.stream = false;
        self.post_json(
            "/api/chat",
            serde_json::to_value(&request)?,
            "Failed to generate chat completion",
        )
        .await
    }

    /// Streaming chat completion.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        request.stream = true;
        let mode = request.format.as_ref().map(|f| f.mode()).unwrap_or_default();

        let spec = RequestSpec {
            method: Method::POST,
            url: self.url("/api/chat"),
            body: Some(serde_json::to_value(&request)?),
            streamed: true,
        };
        let response = self
            .send(spec, "Failed to generate chat completion")
            .await?;
        self.drive_stream(response, OperationKind::Chat, mode, sink)
            .await
    }

    /// Upload one local file as a content-addressed blob.
    pub async fn upload_blob(&self, path: &Path) -> ClientResult<BlobDescriptor> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire("/api/blobs").await;
        }
        crate::metrics::record_request("/api/blobs");
        blob::upload_file(&self.http, &self.base_url, path).await
    }

    /// Create a model: `POST /api/models`, always streamed.
    ///
    /// Every `local_files` entry is uploaded as a content-addressed blob
    /// first and the request's `files` map extended with its reference. A
    /// failed upload aborts the whole submission — the create request is
    /// never sent with a file referencing a blob that does not exist.
    pub async fn create_model(
        &self,
        request: &CreateModelRequest,
        local_files: &[(String, PathBuf)],
        sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let mut request = request.clone();
        request.model = normalize_model_name(&request.model)?;
        if let Some(from) = request.from_model.take() {
            request.from_model = Some(normalize_model_name(&from)?);
        }
        request.stream = true;

        if !local_files.is_empty() {
            let mut files = request.files.take().unwrap_or_default();
            for (name, path) in local_files {
                let descriptor = self.upload_blob(path).await?;
                files.insert(name.clone(), descriptor.reference());
            }
            request.files = Some(files);
        }

        let spec = RequestSpec {
            method: Method::POST,
            url: self.url("/api/models"),
            body: Some(serde_json::to_value(&request)?),
            streamed: true,
        };
        let response = self.send(spec, "Failed to create model").await?;
        self.drive_stream(response, OperationKind::CreateModel, FormatMode::None, sink)
            .await
    }

    /// `GET /api/show/{name}`
    pub async fn show_model(&self, name: &str, verbose: bool) -> ClientResult<Value> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Show { verbose })?;
        let response = self.send(spec, "Failed to show model").await?;
        self.parse_response(response, "/api/show").await
    }

    /// `DELETE /api/models/{name}`
    pub async fn delete_model(&self, name: &str) -> ClientResult<Value> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Delete)?;
        let response = self.send(spec, "Failed to delete model").await?;
        self.parse_response(response, "/api/models").await
    }

    /// `POST /api/models/copy`
    pub async fn copy_model(&self, source: &str, destination: &str) -> ClientResult<Value> {
        let action = ModelAction::Copy {
            destination: destination.to_string(),
        };
        let spec = build_model_action(&self.base_url, source, &action)?;
        let response = self.send(spec, "Failed to copy model").await?;
        self.parse_response(response, "/api/models/copy").await
    }

    /// Streaming `POST /api/models/pull`; `sink` receives status lines.
    pub async fn pull_model_stream(
        &self,
        name: &str,
        sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Pull { stream: true })?;
        let response = self.send(spec, "Failed to pull model").await?;
        self.drive_stream(response, OperationKind::Pull, FormatMode::None, sink)
            .await
    }

    /// Non-streaming `POST /api/models/pull`.
    pub async fn pull_model(&self, name: &str) -> ClientResult<Value> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Pull { stream: false })?;
        let response = self.send(spec, "Failed to pull model").await?;
        self.parse_response(response, "/api/models/pull").await
    }

    /// Streaming `POST /api/models/push`.
    pub async fn push_model_stream(
        &self,
        name: &str,
        sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Push { stream: true })?;
        let response = self.send(spec, "Failed to push model").await?;
        self.drive_stream(response, OperationKind::Push, FormatMode::None, sink)
            .await
    }

    /// Non-streaming `POST /api/models/push`.
    pub async fn push_model(&self, name: &str) -> ClientResult<Value> {
        let spec = build_model_action(&self.base_url, name, &ModelAction::Push { stream: false })?;
        let response = self.send(spec, "Failed to push model").await?;
        self.parse_response(response, "/api/models/push").await
    }

    /// Consume a streamed response, extracting and rendering fragments in
    /// arrival order.
    ///
    /// Reads are synchronous with extraction: the next frame is not pulled
    /// until the current record is rendered, so a slow sink naturally
    /// throttles the read rate. A record carrying an `error` field ends the
    /// stream as a transport failure.
    async fn drive_stream(
        &self,
        response: reqwest::Response,
        kind: OperationKind,
        mode: FormatMode,
        mut sink: impl FnMut(&str),
    ) -> ClientResult<StreamSummary> {
        let mut records_stream = std::pin::pin!(record_stream(response));
        let mut records: u64 = 0;
        let mut rendered_chars: u64 = 0;
        // Raw fragments, for the end-of-stream structured-output check
        let mut raw = String::new();

        while let Some(item) = records_stream.next().await {
            let record = item?;
            if let Some(message) = record.get("error").and_then(Value::as_str) {
                return Err(ClientError::Transport {
                    status: None,
                    message: message.to_string(),
                });
            }

            records += 1;
            crate::metrics::record_stream_record(kind.as_str());

            if mode != FormatMode::None {
                raw.push_str(&extract(kind, FormatMode::None, &record));
            }

            let fragment = extract(kind, mode, &record);
            if !fragment.is_empty() {
                rendered_chars += fragment.chars().count() as u64;
                sink(&fragment);
            }
        }

        if mode != FormatMode::None
            && matches!(kind, OperationKind::Generate | OperationKind::Chat)
            && serde_json::from_str::<Value>(raw.trim()).is_err()
        {
            tracing::warn!(
                operation = kind.as_str(),
                "stream ended before structured output formed a complete JSON document"
            );
        }

        tracing::debug!(operation = kind.as_str(), records, "stream complete");

        Ok(StreamSummary {
            status: OperationStatus::Succeeded,
            records,
            rendered_chars,
        })
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_local() {
        let client = Client::new();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_overrides_base_url_and_trims_slash() {
        let client = Client::new().base_url("http://remote:11434/");
        assert_eq!(client.base_url, "http://remote:11434");
    }

    #[test]
    fn url_joins_base_and_path() {
        let client = Client::new().base_url("http://remote:11434");
        assert_eq!(client.url("/api/chat"), "http://remote:11434/api/chat");
    }

    #[test]
    fn from_config_applies_base_url_and_limiter() {
        let config = ClientConfig {
            base_url: "http://gpu-box:11434/".to_string(),
            rate_limit: Some(crate::config::RateLimitConfig {
                requests_per_second: 5.0,
                burst: 10.0,
            }),
            ..Default::default()
        };
        let client = Client::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://gpu-box:11434");
        assert!(client.limiter.is_some());
    }

    #[test]
    fn default_impl_matches_new() {
        let client = Client::default();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert!(client.limiter.is_none());
    }
}
