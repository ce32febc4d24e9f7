//! LLM provider gateway.
//!
//! `ProviderGateway` is the seam between the orchestrator and whatever
//! backs inference, mirroring the teacher's `BaseLanguageModel` trait
//! object. Two implementations ship: `HttpProviderGateway`, a thin
//! OpenAI-compatible chat-completions client, and
//! `ScriptedProviderGateway`, a deterministic in-memory double for
//! tests and the demo binary.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{TranslationError, TranslationResult};

/// One message in a chat-style completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters passed through to the provider.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
            top_p: 0.9,
        }
    }
}

/// A provider's response to a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
}

/// Abstraction over an LLM backend. Grounded on the teacher's
/// `BaseLanguageModel` trait: async, object-safe, minimal surface.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        params: CompletionParams,
    ) -> TranslationResult<ProviderResponse>;

    async fn list_models(&self) -> TranslationResult<Vec<String>>;

    async fn test_connection(&self) -> bool;

    /// Optional: ensure a specific model is loaded (meaningful for
    /// local inference servers only). Default no-op.
    async fn ensure_model_loaded(&self, _model_id: &str) -> TranslationResult<bool> {
        Ok(true)
    }
}

/// Thin OpenAI-compatible chat-completions client, suitable for
/// OpenAI itself or any compatible local server (LM Studio, vLLM,
/// etc.) depending on `base_url`.
pub struct HttpProviderGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpProviderGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessageBody,
}

#[derive(Deserialize)]
struct ChatCompletionMessageBody {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl ProviderGateway for HttpProviderGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        params: CompletionParams,
    ) -> TranslationResult<ProviderResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatCompletionRequest {
            model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
        };

        let response = self
            .request_builder(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::provider(None, format!("request to {} timed out after {:?}", self.base_url, self.timeout))
                } else {
                    TranslationError::provider(None, format!("cannot reach {}: {e}", self.base_url))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslationError::provider(None, format!("provider returned {status}: {body}")));
        }

        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::provider(None, format!("malformed provider response: {e}")))?;

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::provider(None, "provider response had no choices"))?;
        let usage = data.usage.unwrap_or_default();

        Ok(ProviderResponse {
            content: choice.message.content,
            model: data.model.unwrap_or_else(|| model.to_string()),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            cost: 0.0,
        })
    }

    async fn list_models(&self) -> TranslationResult<Vec<String>> {
        let url = format!("{}/models", self.base_url);
        let mut builder = self.client.get(&url).timeout(Duration::from_secs(10));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| TranslationError::provider(None, format!("failed to list models: {e}")))?;

        #[derive(Deserialize)]
        struct ModelsResponse {
            data: Vec<ModelEntry>,
        }
        #[derive(Deserialize)]
        struct ModelEntry {
            id: String,
        }

        let body: ModelsResponse = response
            .json()
            .await
            .map_err(|e| TranslationError::provider(None, format!("malformed models response: {e}")))?;
        Ok(body.data.into_iter().map(|m| m.id).collect())
    }

    async fn test_connection(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        let mut builder = self.client.get(&url).timeout(Duration::from_secs(5));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        matches!(builder.send().await, Ok(resp) if resp.status().is_success())
    }
}

/// Deterministic, in-memory provider for tests and demos. Responses
/// are served in call order; when the script runs out, the last
/// response is repeated so long documents don't fail a test outright.
pub struct ScriptedProviderGateway {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProviderGateway {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt's final user message, in call order. Useful for
    /// asserting on what context was actually packaged.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderGateway for ScriptedProviderGateway {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        _params: CompletionParams,
    ) -> TranslationResult<ProviderResponse> {
        if let Some(last) = messages.last() {
            self.calls.lock().unwrap().push(last.content.clone());
        }

        let mut queue = self.responses.lock().unwrap();
        let content = match queue.pop_front() {
            Some(next) => {
                *self.last.lock().unwrap() = Some(next.clone());
                next
            }
            None => self.last.lock().unwrap().clone().unwrap_or_default(),
        };

        Ok(ProviderResponse {
            content,
            model: model.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            cost: 0.0,
        })
    }

    async fn list_models(&self) -> TranslationResult<Vec<String>> {
        Ok(vec!["scripted-model".to_string()])
    }

    async fn test_connection(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_gateway_serves_responses_in_order() {
        let gateway = ScriptedProviderGateway::new(vec!["first".to_string(), "second".to_string()]);
        let messages = vec![ChatMessage::user("hi")];
        let r1 = gateway.complete(&messages, "m", CompletionParams::default()).await.unwrap();
        let r2 = gateway.complete(&messages, "m", CompletionParams::default()).await.unwrap();
        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "second");
    }

    #[tokio::test]
    async fn scripted_gateway_repeats_last_response_when_exhausted() {
        let gateway = ScriptedProviderGateway::new(vec!["only".to_string()]);
        let messages = vec![ChatMessage::user("hi")];
        gateway.complete(&messages, "m", CompletionParams::default()).await.unwrap();
        let r2 = gateway.complete(&messages, "m", CompletionParams::default()).await.unwrap();
        assert_eq!(r2.content, "only");
    }

    #[tokio::test]
    async fn scripted_gateway_records_calls() {
        let gateway = ScriptedProviderGateway::new(vec!["ok".to_string()]);
        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("the prompt")];
        gateway.complete(&messages, "m", CompletionParams::default()).await.unwrap();
        assert_eq!(gateway.recorded_calls(), vec!["the prompt".to_string()]);
    }
}
