//! Handlers that call the language-model assistant.
//!
//! | Method | Path                   | Notes |
//! |--------|------------------------|-------|
//! | `POST` | `/areas/{id}/describe` | Cached; `?refresh=true` regenerates |
//! | `POST` | `/areas/{id}/ask`      | Body: `{"question":"..."}` |
//! | `POST` | `/chat`                | Free-form chat with optional history |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use bloom_core::{
  assistant::{Assistant, ChatMessage, ChatReply, ChatRequest},
  model::AreaId,
  store::PhenologyStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, areas::find_view, error::ApiError, prompt};

/// Reply body shared by `/ask` and `/chat`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
  pub response:      String,
  pub model:         String,
  pub tokens_used:   u32,
  pub finish_reason: String,
}

impl From<ChatReply> for ChatResponse {
  fn from(reply: ChatReply) -> Self {
    Self {
      response:      reply.content,
      model:         reply.model,
      tokens_used:   reply.tokens_used,
      finish_reason: reply.finish_reason,
    }
  }
}

// ─── Describe ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct DescribeParams {
  #[serde(default)]
  pub refresh: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DescribeResponse {
  pub area_id:     AreaId,
  pub description: String,
  /// `true` when the stored description was returned without a model call.
  pub cached:      bool,
}

/// `POST /areas/{id}/describe[?refresh=true]`
pub async fn describe<S, A>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<AreaId>,
  Query(params): Query<DescribeParams>,
) -> Result<Json<DescribeResponse>, ApiError>
where
  S: PhenologyStore,
  A: Assistant,
{
  let view = find_view(&*state.store, id).await?;

  if !params.refresh
    && let Some(description) = view.description.clone()
  {
    return Ok(Json(DescribeResponse { area_id: id, description, cached: true }));
  }

  let reply = state
    .assistant
    .complete(ChatRequest::new(prompt::describe_messages(&view)))
    .await
    .map_err(ApiError::assistant)?;

  state
    .store
    .set_area_description(id, reply.content.clone())
    .await
    .map_err(ApiError::store)?;
  tracing::info!(area_id = id, tokens_used = reply.tokens_used, "area description stored");

  Ok(Json(DescribeResponse { area_id: id, description: reply.content, cached: false }))
}

// ─── Ask ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskBody {
  pub question: String,
}

/// `POST /areas/{id}/ask`
pub async fn ask<S, A>(
  State(state): State<AppState<S, A>>,
  Path(id): Path<AreaId>,
  Json(body): Json<AskBody>,
) -> Result<Json<ChatResponse>, ApiError>
where
  S: PhenologyStore,
  A: Assistant,
{
  let question = body.question.trim();
  if question.is_empty() {
    return Err(ApiError::BadRequest("question must not be empty".into()));
  }

  let view = find_view(&*state.store, id).await?;
  let reply = state
    .assistant
    .complete(ChatRequest::new(prompt::ask_messages(&view, question)))
    .await
    .map_err(ApiError::assistant)?;
  Ok(Json(reply.into()))
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatBody {
  pub message:              String,
  pub model:                Option<String>,
  pub temperature:          Option<f32>,
  pub max_tokens:           Option<u32>,
  #[serde(default)]
  pub conversation_history: Vec<ChatMessage>,
}

/// `POST /chat`
pub async fn chat<S, A>(
  State(state): State<AppState<S, A>>,
  Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError>
where
  S: PhenologyStore,
  A: Assistant,
{
  if body.message.trim().is_empty() {
    return Err(ApiError::BadRequest("message must not be empty".into()));
  }
  if let Some(t) = body.temperature
    && !(0.0..=2.0).contains(&t)
  {
    return Err(ApiError::BadRequest(format!("temperature {t} is outside [0, 2]")));
  }

  let mut messages = body.conversation_history;
  messages.push(ChatMessage::user(body.message));

  let reply = state
    .assistant
    .complete(ChatRequest {
      messages,
      model: body.model,
      temperature: body.temperature,
      max_tokens: body.max_tokens,
    })
    .await
    .map_err(ApiError::assistant)?;
  Ok(Json(reply.into()))
}
