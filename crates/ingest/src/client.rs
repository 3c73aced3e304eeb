//! Client boundary for the external ingestion service.
//!
//! The service exposes three calls: submit a package (returns a handle),
//! read the status of a handle, and trigger processing for a handle.
//! Anything non-2xx or malformed is treated as transient, except an
//! explicit 4xx validation rejection, which is terminal.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::package::ExportManifest;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// States the ingestion service reports for a submitted package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestState {
    Received,
    Processing,
    Ready,
    Failed,
}

impl IngestState {
    /// Whether polling can stop at this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// One status response for a submitted package.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestStatus {
    pub state: IngestState,
    pub detail: Option<String>,
}

/// Response returned by the submit call.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReceipt {
    /// Service-assigned identifier for the uploaded package.
    pub handle: String,
    /// Human-followable URL where processing can be watched.
    pub processing_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the ingestion service boundary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Ingestion service error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The service answered 2xx but the body was not the expected shape.
    #[error("Malformed ingestion response: {0}")]
    InvalidResponse(String),

    /// The package file could not be read for upload.
    #[error("Failed to read package {path}: {source}")]
    PackageRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl IngestError {
    /// Whether this failure is a terminal validation rejection.
    ///
    /// Only an explicit 4xx (other than 429) counts; transport errors,
    /// 5xx, and malformed responses are all treated as transient.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Api { status, .. }
            if (400..500).contains(status) && *status != 429)
    }
}

// ---------------------------------------------------------------------------
// Service trait and HTTP implementation
// ---------------------------------------------------------------------------

/// The ingestion service seam.
///
/// The HTTP client implements this for production; tests drive the
/// poller and exporter with scripted stubs.
#[async_trait]
pub trait IngestionService: Send + Sync {
    /// Upload a package; returns the service-assigned handle.
    async fn submit(
        &self,
        package_path: &Path,
        manifest: &ExportManifest,
    ) -> Result<SubmitReceipt, IngestError>;

    /// Read the current status of a submitted package.
    async fn status(&self, handle: &str) -> Result<IngestStatus, IngestError>;

    /// Explicitly start processing of a ready package.
    async fn trigger(&self, handle: &str) -> Result<(), IngestError>;
}

/// HTTP client for the ingestion service.
pub struct HttpIngestionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIngestionClient {
    /// Create a new client.
    ///
    /// * `base_url` - service root, e.g. `http://ingest-host:8080`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, IngestError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(IngestError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, IngestError> {
        let response = Self::ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| IngestError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl IngestionService for HttpIngestionClient {
    async fn submit(
        &self,
        package_path: &Path,
        manifest: &ExportManifest,
    ) -> Result<SubmitReceipt, IngestError> {
        let bytes = tokio::fs::read(package_path)
            .await
            .map_err(|source| IngestError::PackageRead {
                path: package_path.display().to_string(),
                source,
            })?;
        let file_name = package_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("package.zip")
            .to_string();

        let manifest_json = serde_json::to_string(manifest)
            .map_err(|e| IngestError::InvalidResponse(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part(
                "package",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("manifest", manifest_json);

        let response = self
            .client
            .post(format!("{}/packages", self.base_url))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn status(&self, handle: &str) -> Result<IngestStatus, IngestError> {
        let response = self
            .client
            .get(format!("{}/packages/{handle}/status", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn trigger(&self, handle: &str) -> Result<(), IngestError> {
        let response = self
            .client
            .post(format!("{}/packages/{handle}/process", self.base_url))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
