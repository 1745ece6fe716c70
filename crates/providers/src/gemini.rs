//! Google Gemini native provider implementation.
//!
//! Uses the `generateContent` REST endpoint directly.
//!
//! Features:
//! - `x-goog-api-key` header authentication (not Bearer)
//! - Structured output via `responseMimeType` + `responseSchema`
//! - Thinking budget via `thinkingConfig`

use async_trait::async_trait;
use reqsynth_core::error::ProviderError;
use reqsynth_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` provider.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // thinking models can be slow
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: "gemini".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let contents = vec![GeminiContent {
            role: Some("user".into()),
            parts: vec![GeminiPart {
                text: Some(request.prompt.clone()),
                thought: None,
            }],
        }];

        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            generation_config["maxOutputTokens"] = serde_json::json!(max_tokens);
        }

        if let Some(ref schema) = request.response_schema {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
            generation_config["responseSchema"] = to_gemini_schema(&schema.schema);
        }

        if let Some(budget) = request.thinking_budget {
            generation_config["thinkingConfig"] = serde_json::json!({
                "thinkingBudget": budget
            });
        }

        serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        })
    }
}

/// Convert a JSON Schema into the OpenAPI subset Gemini accepts.
///
/// Type names are upper-cased and `additionalProperties` is dropped.
fn to_gemini_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, value) in map {
                match key.as_str() {
                    "additionalProperties" | "$schema" => {}
                    "type" => {
                        let upper = value
                            .as_str()
                            .map(|t| serde_json::Value::String(t.to_uppercase()))
                            .unwrap_or_else(|| value.clone());
                        out.insert(key.clone(), upper);
                    }
                    "properties" => {
                        let props = value
                            .as_object()
                            .map(|p| {
                                p.iter()
                                    .map(|(name, s)| (name.clone(), to_gemini_schema(s)))
                                    .collect::<serde_json::Map<_, _>>()
                            })
                            .unwrap_or_default();
                        out.insert(key.clone(), serde_json::Value::Object(props));
                    }
                    _ => {
                        out.insert(key.clone(), to_gemini_schema(value));
                    }
                }
            }
            serde_json::Value::Object(out)
        }
        other => other.clone(),
    }
}

#[async_trait]
impl reqsynth_core::Provider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, request.model
        );
        let body = Self::build_body(&request);

        debug!(
            provider = "gemini",
            model = %request.model,
            structured = request.is_structured(),
            thinking_budget = ?request.thinking_budget,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 10,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Gemini API key".into(),
            ));
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(request.model));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Gemini API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: GeminiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Gemini response: {e}"),
            })?;

        Self::response_to_provider_response(api_resp, &request.model)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let models = body["models"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m["name"].as_str())
                    .map(|n| n.trim_start_matches("models/").to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

impl GeminiProvider {
    /// Convert a Gemini API response to our ProviderResponse.
    ///
    /// Thought parts are skipped; the remaining text parts are concatenated.
    fn response_to_provider_response(
        resp: GeminiResponse,
        requested_model: &str,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: format!("Prompt blocked: {reason}"),
            });
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            if let Some(reason) = candidate.finish_reason {
                warn!(finish_reason = %reason, "Gemini returned no text");
            }
        }

        let usage = resp.usage_metadata.map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        Ok(ProviderResponse {
            content: text,
            usage,
            model: resp
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
        })
    }
}

// --- Gemini API types ---

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
    #[serde(default)]
    model_version: Option<String>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqsynth_core::Provider;

    #[test]
    fn constructor() {
        let p = GeminiProvider::new("key");
        assert_eq!(p.name(), "gemini");
        assert!(p.base_url.contains("generativelanguage"));
    }

    #[test]
    fn constructor_with_base_url() {
        let p = GeminiProvider::new("key").with_base_url("http://localhost:9999/");
        assert_eq!(p.base_url, "http://localhost:9999");
    }

    #[test]
    fn structured_body_sets_mime_type_schema_and_budget() {
        let mut req = ProviderRequest::new("gemini-2.5-pro", "Synthesize")
            .with_max_tokens(8192)
            .with_thinking_budget(Some(4096));
        req.response_schema = Some(ResponseSchema {
            name: "requirements_document".into(),
            schema: serde_json::json!({
                "type": "object",
                "additionalProperties": false,
                "required": ["title"],
                "properties": {"title": {"type": "string"}}
            }),
        });

        let body = GeminiProvider::build_body(&req);
        let cfg = &body["generationConfig"];
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Synthesize");
        assert_eq!(cfg["responseMimeType"], "application/json");
        assert_eq!(cfg["responseSchema"]["type"], "OBJECT");
        assert_eq!(cfg["responseSchema"]["properties"]["title"]["type"], "STRING");
        assert!(cfg["responseSchema"].get("additionalProperties").is_none());
        assert_eq!(cfg["thinkingConfig"]["thinkingBudget"], 4096);
        assert_eq!(cfg["maxOutputTokens"], 8192);
    }

    #[test]
    fn text_body_has_no_schema() {
        let req = ProviderRequest::new("gemini-2.5-pro", "What are the risks?");
        let body = GeminiProvider::build_body(&req);
        assert!(body["generationConfig"].get("responseSchema").is_none());
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn schema_conversion_recurses_into_arrays() {
        let converted = to_gemini_schema(&serde_json::json!({
            "type": "array",
            "items": {"type": "object", "additionalProperties": false}
        }));
        assert_eq!(converted["type"], "ARRAY");
        assert_eq!(converted["items"]["type"], "OBJECT");
        assert!(converted["items"].get("additionalProperties").is_none());
    }

    #[test]
    fn parse_text_response_skips_thoughts() {
        let resp: GeminiResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"role": "model", "parts": [
                        {"text": "planning...", "thought": true},
                        {"text": "{\"title\":"},
                        {"text": "\"Portal\"}"}
                    ]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 8, "totalTokenCount": 48},
                "modelVersion": "gemini-2.5-pro"
            }"#,
        )
        .unwrap();

        let pr = GeminiProvider::response_to_provider_response(resp, "x").unwrap();
        assert_eq!(pr.content, "{\"title\":\"Portal\"}");
        assert_eq!(pr.usage.unwrap().total_tokens, 48);
        assert_eq!(pr.model, "gemini-2.5-pro");
    }

    #[test]
    fn parse_response_without_candidates() {
        let resp: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(matches!(
            GeminiProvider::response_to_provider_response(resp, "m"),
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[test]
    fn blocked_prompt_is_api_error() {
        let resp: GeminiResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = GeminiProvider::response_to_provider_response(resp, "m").unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_yields_empty_content() {
        let resp: GeminiResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#).unwrap();
        let pr = GeminiProvider::response_to_provider_response(resp, "gemini-2.5-flash").unwrap();
        assert!(pr.content.is_empty());
        assert_eq!(pr.model, "gemini-2.5-flash");
    }
}
