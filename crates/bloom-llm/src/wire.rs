//! Request and response bodies of the `/chat/completions` endpoint.

use bloom_core::assistant::ChatMessage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
  pub model:       &'a str,
  pub messages:    &'a [ChatMessage],
  pub temperature: f32,
  pub max_tokens:  u32,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
  pub model:   String,
  pub choices: Vec<Choice>,
  #[serde(default)]
  pub usage:   Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
  pub message:       ReplyMessage,
  #[serde(default)]
  pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyMessage {
  #[serde(default)]
  pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
  pub total_tokens: u32,
}

/// `{"error": {"message": ..., "type": ..., "code": ...}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
  pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
  pub message: String,
  #[serde(rename = "type", default)]
  pub kind:    Option<String>,
  #[serde(default)]
  pub code:    Option<String>,
}
