//! The external text provider paid charges are spent on.

use crate::config::ProviderConfig;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Turns a payload into text, or fails
#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn call(&self, payload: &str) -> anyhow::Result<String>;
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAiCompatibleProvider {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ProviderConfig) -> anyhow::Result<Self> {
        let mut base = config.url.clone().context("provider.url is not configured")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("chat/completions")?;

        Ok(Self {
            client: Client::builder().build()?,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextProvider for OpenAiCompatibleProvider {
    async fn call(&self, payload: &str) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: payload }],
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.context("provider request failed")?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("provider returned {status}: {detail}"));
        }

        let completion: ChatResponse = response.json().await.context("provider returned malformed JSON")?;
        debug!(choices = completion.choices.len(), "Provider call completed");

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("provider returned no content"))
    }
}
