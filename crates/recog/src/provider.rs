//! The provider trait every recognition backend implements.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::RecognitionError;

/// What a step feeds into a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionPayload {
    /// The raw input file on disk (image or document scan).
    Document(PathBuf),
    /// Text produced by earlier steps.
    Text(String),
}

/// What a provider hands back on success.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// The recognised/transformed text.
    pub text: String,
    /// Backend-reported confidence in `0.0..=1.0`, if available.
    pub confidence: Option<f64>,
}

/// A recognition backend.
///
/// Implementations must be cheap to share (`Arc<dyn RecognitionProvider>`)
/// and must not retry internally; classification and retry budgets are
/// owned by the execution engine. The `config` blob is provider-specific
/// and arrives exactly as stored on the chain step; implementations parse
/// it themselves, the engine never does.
#[async_trait]
pub trait RecognitionProvider: Send + Sync {
    async fn recognize(
        &self,
        payload: &RecognitionPayload,
        config: &serde_json::Value,
    ) -> Result<Recognition, RecognitionError>;
}
