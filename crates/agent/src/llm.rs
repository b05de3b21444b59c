use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use eorbench_core::config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You review employer-of-record cost quotes. Reply with a single JSON \
object and nothing else. Never invent, change or restate monetary amounts.";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const RETRY_BACKOFF_MS: u64 = 250;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat-completion client for the configured provider.
pub struct HttpLlmClient {
    http: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if matches!(config.provider, LlmProvider::OpenAi | LlmProvider::Anthropic)
            && config.api_key.is_none()
        {
            bail!("llm.api_key is required for {:?}", config.provider);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build llm http client")?;
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Ok(Self {
            http,
            provider: config.provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Engine identifier, e.g. `openai:gpt-4o-mini`.
    pub fn engine_id(&self) -> String {
        format!("{}:{}", provider_name(self.provider), self.model)
    }

    fn endpoint(&self) -> String {
        match self.provider {
            LlmProvider::OpenAi => format!("{}/chat/completions", self.base_url),
            LlmProvider::Anthropic => format!("{}/messages", self.base_url),
            LlmProvider::Ollama => format!("{}/api/chat", self.base_url),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::OpenAi => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt}
                ],
                "temperature": 0.0,
                "max_tokens": MAX_TOKENS,
                "response_format": {"type": "json_object"}
            }),
            LlmProvider::Anthropic => json!({
                "model": self.model,
                "system": SYSTEM_PROMPT,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": MAX_TOKENS,
                "temperature": 0.0
            }),
            LlmProvider::Ollama => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt}
                ],
                "stream": false,
                "format": "json"
            }),
        }
    }

    async fn send_once(&self, prompt: &str) -> Result<String> {
        let mut request = self.http.post(self.endpoint()).json(&self.request_body(prompt));
        if let Some(api_key) = &self.api_key {
            request = match self.provider {
                LlmProvider::Anthropic => request
                    .header("x-api-key", api_key.expose_secret())
                    .header("anthropic-version", ANTHROPIC_VERSION),
                _ => request.bearer_auth(api_key.expose_secret()),
            };
        }

        let response = request.send().await.context("llm request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("llm api error {status}: {body}");
        }

        let body: Value = response.json().await.context("llm response was not json")?;
        response_content(self.provider, &body)
            .ok_or_else(|| anyhow!("llm response carried no message content"))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(prompt).await {
                Ok(content) => {
                    debug!(
                        event_name = "agent.llm.completed",
                        engine = %self.engine_id(),
                        attempt,
                        "llm completion received"
                    );
                    return Ok(content);
                }
                Err(error) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "agent.llm.retrying",
                        engine = %self.engine_id(),
                        attempt,
                        error = %error,
                        "llm call failed; retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                        .await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

pub fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama => "http://localhost:11434",
    }
}

pub fn provider_name(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "openai",
        LlmProvider::Anthropic => "anthropic",
        LlmProvider::Ollama => "ollama",
    }
}

fn response_content(provider: LlmProvider, body: &Value) -> Option<String> {
    let content = match provider {
        LlmProvider::OpenAi => body.pointer("/choices/0/message/content"),
        LlmProvider::Anthropic => body.pointer("/content/0/text"),
        LlmProvider::Ollama => body.pointer("/message/content"),
    };
    content.and_then(Value::as_str).map(str::to_string)
}

/// Parses the JSON object in a completion, tolerating prose or markdown
/// fences around it.
pub fn parse_json_reply(content: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content.trim()) {
        return Ok(value);
    }
    let start = content.find('{').ok_or_else(|| anyhow!("reply contains no json object"))?;
    let end = content.rfind('}').ok_or_else(|| anyhow!("reply contains no json object"))?;
    if end < start {
        bail!("reply contains no json object");
    }
    serde_json::from_str(&content[start..=end]).context("reply json is malformed")
}
