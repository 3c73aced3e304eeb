//! HTTP recognition backend client.
//!
//! Talks to a recognition service exposing a single `POST` endpoint:
//! text payloads go as JSON, document payloads as multipart with the file
//! bytes and the config blob attached. The response is expected to be
//! `{"text": "...", "confidence": 0.97}` with `confidence` optional.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::RecognitionError;
use crate::provider::{Recognition, RecognitionPayload, RecognitionProvider};

/// Response body returned by a recognition backend.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    text: String,
    confidence: Option<f64>,
}

/// HTTP client for a single recognition backend.
pub struct HttpRecognitionProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpRecognitionProvider {
    /// Create a new client for a backend endpoint, e.g.
    /// `http://ocr-host:9090/recognize`.
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`] (useful
    /// for connection pooling across many backends).
    pub fn with_client(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    /// Backend endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ensure the response has a success status code, or surface the
    /// status and body as a [`RecognitionError::Api`].
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RecognitionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RecognitionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RecognitionProvider for HttpRecognitionProvider {
    async fn recognize(
        &self,
        payload: &RecognitionPayload,
        config: &serde_json::Value,
    ) -> Result<Recognition, RecognitionError> {
        let response = match payload {
            RecognitionPayload::Text(text) => {
                let body = serde_json::json!({
                    "text": text,
                    "config": config,
                });
                self.client.post(&self.endpoint).json(&body).send().await?
            }
            RecognitionPayload::Document(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|source| {
                    RecognitionError::InputFile {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("document")
                    .to_string();

                let form = reqwest::multipart::Form::new()
                    .part(
                        "file",
                        reqwest::multipart::Part::bytes(bytes).file_name(file_name),
                    )
                    .text("config", config.to_string());

                self.client
                    .post(&self.endpoint)
                    .multipart(form)
                    .send()
                    .await?
            }
        };

        let response = Self::ensure_success(response).await?;
        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;

        Ok(Recognition {
            text: parsed.text,
            confidence: parsed.confidence,
        })
    }
}
