//! Provider fallback: an ordered chain of backends for one generation request.
//!
//! Each link runs under its own time limit. A link that errors, times out, or
//! returns blank text hands the request to the next link. The chain reports
//! the sum of its limits as its [`time_budget`](Provider::time_budget).

use async_trait::async_trait;
use reqsynth_core::error::ProviderError;
use reqsynth_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A provider that tries an ordered list of providers until one answers.
pub struct FallbackProvider {
    name: String,
    links: Vec<Link>,
}

struct Link {
    provider: Arc<dyn Provider>,
    limit: Duration,
}

impl Link {
    /// One attempt. Expiry and blank text are failures like any other.
    async fn attempt(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let response = tokio::time::timeout(self.limit, self.provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "provider '{}' gave no response within {}s",
                    self.provider.name(),
                    self.limit.as_secs()
                ))
            })??;

        if response.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(response)
    }
}

impl FallbackProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            links: Vec::new(),
        }
    }

    /// Append `provider`, allowing it `limit` per request.
    pub fn add(mut self, provider: Arc<dyn Provider>, limit: Duration) -> Self {
        self.links.push(Link { provider, limit });
        self
    }

    /// Names of the chained providers, in the order they are tried.
    pub fn members(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.provider.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Longest a request can take when every link runs to its limit.
    pub fn total_limit(&self) -> Duration {
        self.links.iter().map(|l| l.limit).sum()
    }
}

#[async_trait]
impl Provider for FallbackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut failed: Vec<&str> = Vec::new();
        let mut last_error = ProviderError::NotConfigured("fallback chain has no providers".into());

        for link in &self.links {
            let member = link.provider.name();
            match link.attempt(request.clone()).await {
                Ok(response) => {
                    if !failed.is_empty() {
                        info!(provider = member, skipped = ?failed, "Fallback provider answered");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(provider = member, error = %e, "Provider failed, trying next in chain");
                    failed.push(member);
                    last_error = e;
                }
            }
        }

        warn!(chain = %self.name, tried = ?failed, "Every provider in the chain failed");
        Err(last_error)
    }

    /// Models offered by any member, deduplicated and sorted.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let mut models = BTreeSet::new();
        for link in &self.links {
            if let Ok(found) = link.provider.list_models().await {
                models.extend(found);
            }
        }
        Ok(models.into_iter().collect())
    }

    /// Healthy when at least one member is.
    async fn health_check(&self) -> Result<bool, ProviderError> {
        for link in &self.links {
            if matches!(link.provider.health_check().await, Ok(true)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn time_budget(&self, per_call: Duration) -> Duration {
        self.total_limit().max(per_call)
    }
}
