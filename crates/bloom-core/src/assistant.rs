//! The `Assistant` trait: an opaque text-completion service.
//!
//! Implemented by `bloom-llm` for OpenAI-compatible providers. The API layer
//! builds the messages; the assistant only turns them into a reply.

use std::future::Future;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    Role,
  pub content: String,
}

impl ChatMessage {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }
}

/// A completion request. Unset tuning fields fall back to the assistant's
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
  pub messages:    Vec<ChatMessage>,
  pub model:       Option<String>,
  pub temperature: Option<f32>,
  pub max_tokens:  Option<u32>,
}

impl ChatRequest {
  pub fn new(messages: Vec<ChatMessage>) -> Self {
    Self { messages, ..Default::default() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
  pub content:       String,
  pub model:         String,
  pub tokens_used:   u32,
  pub finish_reason: String,
}

/// Why a completion failed, in terms a caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// No usable credentials; nothing was sent.
  NotConfigured,
  /// The provider rejected the credentials.
  Unauthorized,
  RateLimited,
  QuotaExceeded,
  /// Transport errors, provider outages and malformed replies.
  Unavailable,
}

/// Maps an assistant error onto a [`FailureKind`].
pub trait ClassifyFailure {
  fn failure_kind(&self) -> FailureKind { FailureKind::Unavailable }
}

pub trait Assistant: Send + Sync {
  type Error: std::error::Error + ClassifyFailure + Send + Sync + 'static;

  fn complete(
    &self,
    request: ChatRequest,
  ) -> impl Future<Output = Result<ChatReply, Self::Error>> + Send + '_;
}
