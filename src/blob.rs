//! Content-addressed blob upload
//!
//! Model-creation requests reference large local artifacts (weights,
//! adapters) by digest rather than by upload session: the SHA-256 of the
//! file bytes is the artifact's durable identity, so re-uploading identical
//! bytes always lands on the same reference and needs no client-side dedup.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{ClientError, ClientResult};

/// Digest algorithm used for blob references.
pub const DIGEST_ALGORITHM: &str = "sha256";

/// A local file staged for content-addressed upload.
///
/// `remote_reference` stays `None` until the server acknowledges the
/// upload; a pending descriptor must never be referenced by a
/// model-creation request.
#[derive(Debug, Clone)]
pub struct BlobDescriptor {
    pub local_file: PathBuf,
    /// Lowercase hex SHA-256 of the file bytes
    pub digest_hex: String,
    pub remote_reference: Option<String>,
}

impl BlobDescriptor {
    /// Stage `path` for upload, computing its digest.
    pub async fn stage(path: impl Into<PathBuf>) -> ClientResult<Self> {
        let local_file = path.into();
        let bytes = tokio::fs::read(&local_file).await?;
        Ok(Self {
            digest_hex: digest_bytes(&bytes),
            local_file,
            remote_reference: None,
        })
    }

    /// The `sha256:<hex>` reference this blob is addressed by.
    pub fn reference(&self) -> String {
        format!("{DIGEST_ALGORITHM}:{}", self.digest_hex)
    }
}

/// SHA-256 of a byte buffer as lowercase hex.
pub fn digest_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Upload one local file as a content-addressed blob.
///
/// Reads the file, computes its digest, and POSTs the raw bytes under
/// `/api/blobs/sha256:<hex>`. The server rejects an upload whose payload
/// hash does not match the declared reference. Any non-2xx status fails the
/// upload; the caller must abort the enclosing model-creation submission in
/// that case.
pub async fn upload_file(
    http: &reqwest::Client,
    base_url: &str,
    path: &Path,
) -> ClientResult<BlobDescriptor> {
    let bytes = tokio::fs::read(path).await?;
    let mut descriptor = BlobDescriptor {
        local_file: path.to_path_buf(),
        digest_hex: digest_bytes(&bytes),
        remote_reference: None,
    };
    let reference = descriptor.reference();
    let url = format!("{base_url}/api/blobs/{reference}");

    tracing::debug!(
        file = %path.display(),
        reference = %reference,
        size = bytes.len(),
        "uploading blob"
    );

    let response = http
        .post(&url)
        .body(bytes)
        .send()
        .await
        .map_err(|e| crate::error::map_reqwest_error(e, &url))?;

    let status = response.status();
    if !status.is_success() {
        crate::metrics::record_blob_upload("rejected");
        return Err(ClientError::Upload {
            reference,
            status: status.as_u16(),
        });
    }

    crate::metrics::record_blob_upload("accepted");
    tracing::info!(file = %path.display(), reference = %reference, "blob uploaded");

    descriptor.remote_reference = Some(reference);
    Ok(descriptor)
}
