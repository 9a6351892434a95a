//! OpenAI-compatible chat completions behind the [`Assistant`] trait.
//!
//! [`OpenAiClient`] posts to `{base_url}/chat/completions` with a bearer key.
//! The key is checked locally before every request, so a missing or
//! malformed key never reaches the network.

mod wire;

pub mod error;

use std::{future::Future, time::Duration};

use bloom_core::assistant::{Assistant, ChatReply, ChatRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub use error::{Error, ProviderErrorKind, Result};

use crate::wire::{CompletionRequest, CompletionResponse, ErrorEnvelope};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
  pub api_key:      Option<String>,
  pub model:        String,
  pub base_url:     String,
  pub temperature:  f32,
  pub max_tokens:   u32,
  pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
  fn default() -> Self {
    Self {
      api_key:      None,
      model:        "gpt-3.5-turbo".into(),
      base_url:     "https://api.openai.com/v1".into(),
      temperature:  0.7,
      max_tokens:   500,
      timeout_secs: 30,
    }
  }
}

/// `true` if `key` looks like an OpenAI secret key.
pub fn validate_api_key(key: &str) -> bool { key.starts_with("sk-") && key.len() >= 20 }

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenAiClient {
  client: Client,
  config: OpenAiConfig,
}

impl OpenAiClient {
  pub fn new(config: OpenAiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &OpenAiConfig { &self.config }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
  }

  fn api_key(&self) -> Result<&str> {
    match self.config.api_key.as_deref() {
      None | Some("") => Err(Error::MissingApiKey),
      Some(key) if !validate_api_key(key) => Err(Error::InvalidApiKey),
      Some(key) => Ok(key),
    }
  }

  async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
    let key = self.api_key()?;
    let model = request.model.as_deref().unwrap_or(&self.config.model);
    let body = CompletionRequest {
      model,
      messages: &request.messages,
      temperature: request.temperature.unwrap_or(self.config.temperature),
      max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
    };

    tracing::info!(model, messages = request.messages.len(), "sending chat completion");
    let resp = self.client.post(self.url()).bearer_auth(key).json(&body).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(provider_error(status.as_u16(), &text));
    }

    let reply = into_reply(resp.json().await?)?;
    tracing::info!(tokens_used = reply.tokens_used, "chat completion received");
    Ok(reply)
  }
}

impl Assistant for OpenAiClient {
  type Error = Error;

  fn complete(
    &self,
    request: ChatRequest,
  ) -> impl Future<Output = Result<ChatReply>> + Send + '_ {
    self.send(request)
  }
}

fn provider_error(status: u16, body: &str) -> Error {
  let (message, code) = match serde_json::from_str::<ErrorEnvelope>(body) {
    Ok(env) => (env.error.message, env.error.code.or(env.error.kind)),
    Err(_) => (body.trim().to_string(), None),
  };
  let kind = ProviderErrorKind::classify(status, code.as_deref());
  tracing::error!(status, ?kind, %message, "chat completion failed");
  Error::Provider { status, kind, message }
}

fn into_reply(resp: CompletionResponse) -> Result<ChatReply> {
  let choice = resp.choices.into_iter().next().ok_or(Error::EmptyReply)?;
  Ok(ChatReply {
    content:       choice.message.content.unwrap_or_default(),
    model:         resp.model,
    tokens_used:   resp.usage.map(|u| u.total_tokens).unwrap_or(0),
    finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".into()),
  })
}
