//! Timed provider calls.

use reqsynth_core::error::ProviderError;
use reqsynth_core::provider::ProviderResponse;
use std::future::Future;
use std::time::Duration;

/// Await a provider call, mapping expiry of `limit` to `ProviderError::Timeout`.
///
/// `limit` is the provider's `time_budget` for the configured request timeout.
pub(crate) async fn with_timeout<F>(limit: Duration, call: F) -> Result<ProviderResponse, ProviderError>
where
    F: Future<Output = Result<ProviderResponse, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(format!(
            "no response within {}s",
            limit.as_secs()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_result() {
        let resp = with_timeout(Duration::from_secs(1), async {
            Err(ProviderError::EmptyResponse)
        })
        .await;
        assert!(matches!(resp, Err(ProviderError::EmptyResponse)));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_timeout_error() {
        let resp = with_timeout(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(ProviderError::EmptyResponse)
        })
        .await;
        assert!(matches!(resp, Err(ProviderError::Timeout(_))));
    }
}
