//! Registry of known recognition providers.
//!
//! The registry is the "known-provider set": a chain step's provider
//! identifier is resolved here at execution time, and an unknown
//! identifier fails the task permanently. Built from the
//! `RECOGNITION_PROVIDERS` environment variable in the binaries;
//! tests register in-memory providers directly.

use std::collections::HashMap;
use std::sync::Arc;

use folio_core::error::CoreError;

use crate::http::HttpRecognitionProvider;
use crate::provider::RecognitionProvider;

/// Maps provider identifiers to their backend implementations.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn RecognitionProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of [`HttpRecognitionProvider`]s from a spec
    /// string of the form `id=url,id2=url2`.
    ///
    /// A shared [`reqwest::Client`] backs all entries so connections are
    /// pooled across backends.
    pub fn from_spec(spec: &str) -> Result<Self, CoreError> {
        let client = reqwest::Client::new();
        let mut registry = Self::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, url) = entry.split_once('=').ok_or_else(|| {
                CoreError::Validation(format!(
                    "Provider entry '{entry}' is not of the form id=url"
                ))
            })?;
            let (id, url) = (id.trim(), url.trim());
            if id.is_empty() || url.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Provider entry '{entry}' has an empty id or url"
                )));
            }
            registry.insert(
                id,
                Arc::new(HttpRecognitionProvider::with_client(
                    client.clone(),
                    url.to_string(),
                )),
            );
        }

        Ok(registry)
    }

    /// Register a provider under an identifier, replacing any previous
    /// entry with the same id.
    pub fn insert(&mut self, id: &str, provider: Arc<dyn RecognitionProvider>) {
        self.providers.insert(id.to_string(), provider);
    }

    /// Look up a provider by identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn RecognitionProvider>> {
        self.providers.get(id).cloned()
    }

    /// Whether an identifier is known.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    /// All registered identifiers, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
