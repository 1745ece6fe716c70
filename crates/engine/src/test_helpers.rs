//! Shared test helpers for engine tests.

use reqsynth_core::error::ProviderError;
use reqsynth_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next result in the queue and records
/// the request it was given. Panics if more calls are made than results provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every call in order with the given texts.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();

        if call >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                call,
                responses.len()
            );
        }

        requests.push(request);
        responses[call].clone()
    }
}

/// A provider that never answers within any reasonable timeout.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!()
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A contract-valid document JSON citing `source_id`.
pub fn document_json(title: &str, source_id: &str) -> String {
    serde_json::json!({
        "title": title,
        "sections": [
            {
                "id": "exec-summary",
                "title": "Executive Summary",
                "content": format!("A self-service portal for customers [Source ID: {source_id}].")
            },
            {
                "id": "functional",
                "title": "Functional Requirements",
                "content": format!("- Users log in with email and password [Source ID: {source_id}]")
            }
        ],
        "conflicts": []
    })
    .to_string()
}
