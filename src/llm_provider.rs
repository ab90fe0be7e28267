//! LLM providers: Anthropic, OpenAI-compatible servers and an offline mock.

use crate::config::{Config, ProviderConfig, ProviderKind};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-haiku-20240307";
const OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Sends the prompt and returns the full response text.
    async fn complete(&self, request: &PromptRequest) -> Result<String>;

    /// Streams the response, handing each text delta to `on_text`, and
    /// returns the accumulated text.
    async fn complete_streaming(
        &self,
        request: &PromptRequest,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let text = self.complete(request).await?;
        on_text(&text);
        Ok(text)
    }
}

/// Builds the provider `requested` (or the configured current one).
pub fn create_provider(config: &Config, requested: Option<&str>) -> Result<Box<dyn LlmProvider>> {
    if config.use_mock {
        info!("Using mock provider (HOW_USE_MOCK=1)");
        return Ok(Box::new(MockProvider::new()));
    }

    let (name, provider) = config.active_provider(requested)?;
    info!("Using provider '{}' ({})", name, provider.kind);

    match provider.kind {
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::from_config(
            &name,
            &provider,
            ReqwestHttpClient::new(),
        )?)),
        ProviderKind::OpenAi => Ok(Box::new(OpenAiProvider::from_config(
            &name,
            &provider,
            ReqwestHttpClient::new(),
        )?)),
    }
}

/// Pulls `error.message` out of a provider error envelope.
fn error_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .filter(|e| !e.is_null())
        .and_then(|e| e.get("message").or(Some(e)))
        .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
}

/// Splits a server-sent-event byte stream into `data:` payloads.
///
/// Chunks may end anywhere, including inside a UTF-8 sequence, so bytes are
/// buffered until a full line is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds bytes and returns every `data:` payload completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(data) = line.trim_end().strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Runs a streaming request, feeding each SSE payload to `handle`, which
/// returns the text delta it carried (if any).
async fn stream_sse<C, F>(
    client: &C,
    url: &str,
    headers: &[(&str, &str)],
    body: &Value,
    on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    mut handle: F,
) -> Result<String>
where
    C: HttpClient,
    F: FnMut(&str) -> Result<Option<String>> + Send,
{
    let mut decoder = SseDecoder::new();
    let mut text = String::new();
    let mut failure: Option<anyhow::Error> = None;

    client
        .post_json_streaming(url, headers, body, &mut |bytes: &[u8]| {
            if failure.is_some() {
                return;
            }
            for payload in decoder.push(bytes) {
                match handle(&payload) {
                    Ok(Some(delta)) => {
                        on_text(&delta);
                        text.push_str(&delta);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        failure = Some(e);
                        return;
                    }
                }
            }
        })
        .await?;

    match failure {
        Some(e) => Err(e),
        None => Ok(text),
    }
}

pub struct AnthropicProvider<C: HttpClient = ReqwestHttpClient> {
    name: String,
    client: C,
    api_key: String,
    model: String,
    max_tokens: u32,
    url: String,
}

impl<C: HttpClient> AnthropicProvider<C> {
    pub fn from_config(name: &str, config: &ProviderConfig, client: C) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            anyhow!(
                "No Anthropic API key found for provider '{}'. Please set it using one of these methods:

1. Run the setup wizard:
   how setup

2. Set environment variable:
   export ANTHROPIC_API_KEY=sk-ant-your-key-here

Get your API key from: https://console.anthropic.com",
                name
            )
        })?;

        Ok(Self {
            name: name.to_string(),
            client,
            api_key,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            url: config.base_url.clone().unwrap_or_else(|| ANTHROPIC_URL.to_string()),
        })
    }

    fn request_body(&self, request: &PromptRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": request.system,
            "stream": stream,
            "messages": [
                {
                    "role": "user",
                    "content": request.user
                }
            ]
        })
    }

    fn parse_response(response_text: &str) -> Result<String> {
        let value: Value = serde_json::from_str(response_text).map_err(|e| {
            anyhow!("Failed to parse Anthropic response as JSON: {}\nRaw response: {}", e, response_text)
        })?;

        if let Some(message) = error_message(&value) {
            return Err(anyhow!("Anthropic API error: {}", message));
        }

        let text: String = value
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            warn!("Anthropic response had no text content: {}", response_text);
            return Err(anyhow!("Anthropic API returned an empty response"));
        }
        Ok(text)
    }

    fn parse_stream_event(payload: &str) -> Result<Option<String>> {
        let Ok(event) = serde_json::from_str::<Value>(payload) else {
            debug!("Ignoring non-JSON stream payload: {}", payload);
            return Ok(None);
        };
        match event.get("type").and_then(|t| t.as_str()) {
            Some("content_block_delta") => Ok(event
                .pointer("/delta/text")
                .and_then(|t| t.as_str())
                .map(str::to_string)),
            Some("error") => Err(anyhow!(
                "Anthropic API error: {}",
                error_message(&event).unwrap_or_else(|| payload.to_string())
            )),
            _ => Ok(None),
        }
    }

    fn headers(&self) -> [(&str, &str); 3] {
        [
            ("x-api-key", self.api_key.as_str()),
            ("content-type", "application/json"),
            ("anthropic-version", ANTHROPIC_VERSION),
        ]
    }
}

#[async_trait]
impl<C: HttpClient> LlmProvider for AnthropicProvider<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &PromptRequest) -> Result<String> {
        let body = self.request_body(request, false);
        let response_text = self.client.post_json(&self.url, &self.headers(), &body).await?;
        debug!("Anthropic API response: {}", response_text);
        Self::parse_response(&response_text)
    }

    async fn complete_streaming(
        &self,
        request: &PromptRequest,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let body = self.request_body(request, true);
        stream_sse(
            &self.client,
            &self.url,
            &self.headers(),
            &body,
            on_text,
            Self::parse_stream_event,
        )
        .await
    }
}

/// OpenAI chat completions, or any compatible server (Ollama, vLLM, ...).
pub struct OpenAiProvider<C: HttpClient = ReqwestHttpClient> {
    name: String,
    client: C,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    url: String,
}

impl<C: HttpClient> OpenAiProvider<C> {
    /// A key is required unless a custom `base_url` points at a local server.
    pub fn from_config(name: &str, config: &ProviderConfig, client: C) -> Result<Self> {
        if config.api_key.is_none() && config.base_url.is_none() {
            return Err(anyhow!(
                "No OpenAI API key found for provider '{}'. Please set it using one of these methods:

1. Run the setup wizard:
   how setup

2. Set environment variable:
   export OPENAI_API_KEY=sk-your-key-here",
                name
            ));
        }

        let base = config.base_url.as_deref().unwrap_or(OPENAI_URL).trim_end_matches('/');
        Ok(Self {
            name: name.to_string(),
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            url: format!("{}/chat/completions", base),
        })
    }

    fn request_body(&self, request: &PromptRequest, stream: bool) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "stream": stream,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user }
            ]
        })
    }

    fn parse_response(response_text: &str) -> Result<String> {
        let value: Value = serde_json::from_str(response_text).map_err(|e| {
            anyhow!("Failed to parse OpenAI response as JSON: {}\nRaw response: {}", e, response_text)
        })?;

        if let Some(message) = error_message(&value) {
            return Err(anyhow!("OpenAI API error: {}", message));
        }

        value
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow!("OpenAI API returned an empty response"))
    }

    fn parse_stream_event(payload: &str) -> Result<Option<String>> {
        if payload == "[DONE]" {
            return Ok(None);
        }
        let Ok(event) = serde_json::from_str::<Value>(payload) else {
            debug!("Ignoring non-JSON stream payload: {}", payload);
            return Ok(None);
        };
        if let Some(message) = error_message(&event) {
            return Err(anyhow!("OpenAI API error: {}", message));
        }
        Ok(event
            .pointer("/choices/0/delta/content")
            .and_then(|c| c.as_str())
            .map(str::to_string))
    }

    fn authorization(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| format!("Bearer {}", key))
    }
}

#[async_trait]
impl<C: HttpClient> LlmProvider for OpenAiProvider<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &PromptRequest) -> Result<String> {
        let body = self.request_body(request, false);
        let auth = self.authorization();
        let mut headers = vec![("content-type", "application/json")];
        if let Some(auth) = &auth {
            headers.push(("authorization", auth.as_str()));
        }
        let response_text = self.client.post_json(&self.url, &headers, &body).await?;
        debug!("OpenAI API response: {}", response_text);
        Self::parse_response(&response_text)
    }

    async fn complete_streaming(
        &self,
        request: &PromptRequest,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let body = self.request_body(request, true);
        let auth = self.authorization();
        let mut headers = vec![("content-type", "application/json")];
        if let Some(auth) = &auth {
            headers.push(("authorization", auth.as_str()));
        }
        stream_sse(
            &self.client,
            &self.url,
            &headers,
            &body,
            on_text,
            Self::parse_stream_event,
        )
        .await
    }
}

/// Offline provider with canned answers, used for demos and tests.
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn mock_response(&self, question: &str) -> String {
        let question = question.to_lowercase();

        if question.contains("port") {
            r#"## Finding processes on a port

Use `lsof` to see which process is **listening** on the port:

```bash
$ lsof -i :8080
ss -ltnp | grep 8080
```

> If nothing shows up, the process may belong to another user; try again with sudo.

<structured_commands>
{"commands": [
  {"command": "lsof -i :8080", "description": "List processes using port 8080", "order": 1, "safe": true},
  {"command": "ss -ltnp | grep 8080", "description": "Show listening sockets on port 8080", "order": 2, "safe": true}
], "workflows": []}
</structured_commands>"#
                .to_string()
        } else if question.contains("disk") || question.contains("space") {
            r#"## Checking disk usage

| Command | Shows |
| --- | --- |
| df -h | Free space per filesystem |
| du -sh * | Size of each entry here |

```bash
df -h
du -sh *
```
"#
            .to_string()
        } else if question.contains("delete") || question.contains("remove") || question.contains("clean") {
            r#"# Cleaning up

- Preview what would be removed first
- Then *delete* it

```bash
find /tmp -name '*.log' -mtime +7
rm -rf /tmp/old-logs
```

<structured_commands>
{"commands": [],
 "workflows": [{"name": "Clean old logs", "description": "Preview, then delete",
   "steps": [
     {"command": "find /tmp -name '*.log' -mtime +7", "description": "Preview files", "order": 1, "safe": true},
     {"command": "rm -rf /tmp/old-logs", "description": "Delete them", "order": 2, "safe": false}
   ]}]}
</structured_commands>"#
                .to_string()
        } else if question.contains("git") || question.contains("branch") {
            r#"Show the current branch and recent history:

```sh
git branch --show-current
git log --oneline -5
```
"#
            .to_string()
        } else {
            format!(
                "I'm running in mock mode, so here is a generic answer for: {}\n\n```bash\nls -la\n```\n",
                question.trim()
            )
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &PromptRequest) -> Result<String> {
        let question = request.user.split("\n\n<context>").next().unwrap_or("");
        Ok(self.mock_response(question))
    }
}
