//! ollamactl - Ollama API client
//!
//! A client library and CLI for driving an Ollama-compatible model server
//! over HTTP: completion and chat generation with incremental NDJSON
//! streaming, embeddings, model management, and content-addressed blob
//! uploads for model creation.

pub mod blob;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod limit;
pub mod metrics;
pub mod request;
pub mod stream;
pub mod types;

pub use blob::BlobDescriptor;
pub use client::Client;
pub use config::{ClientConfig, RateLimitConfig};
pub use error::{ClientError, ClientResult};
pub use extract::{FormatMode, OperationKind};
pub use request::{ModelAction, RequestSpec};
pub use stream::LineDemuxer;
pub use types::{
    ChatRequest, CreateModelRequest, GenerateRequest, Message, OperationStatus, StreamSummary,
};
