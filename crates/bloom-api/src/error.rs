//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bloom_core::assistant::{ClassifyFailure, FailureKind};
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  /// The language-model provider failed or is not configured.
  #[error("assistant error: {source}")]
  Assistant {
    kind:   FailureKind,
    #[source]
    source: BoxError,
  },
}

impl ApiError {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn assistant<E: std::error::Error + ClassifyFailure + Send + Sync + 'static>(e: E) -> Self {
    Self::Assistant { kind: e.failure_kind(), source: Box::new(e) }
  }
}

/// The message shown to API clients for an assistant failure.
fn assistant_message(kind: FailureKind, source: &BoxError) -> String {
  match kind {
    FailureKind::NotConfigured => source.to_string(),
    FailureKind::Unauthorized => {
      "the provider rejected the API key; check that it is correct and active".into()
    }
    FailureKind::RateLimited => "the provider rate limit was reached; try again shortly".into(),
    FailureKind::QuotaExceeded => {
      "the provider quota for this API key is exhausted; check the account balance".into()
    }
    FailureKind::Unavailable => format!("assistant request failed: {source}"),
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": e.to_string() }))
      }
      ApiError::Assistant { kind, source } => {
        tracing::error!(?kind, error = %source, "assistant failure");
        let message = assistant_message(*kind, source);
        (StatusCode::BAD_GATEWAY, json!({ "error": message, "kind": kind }))
      }
    };
    (status, Json(body)).into_response()
  }
}
