//! The `bloom` server: settings and the top-level HTTP application.

pub mod settings;

use std::sync::Arc;

use axum::Router;
use bloom_core::{assistant::Assistant, store::PhenologyStore};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use settings::Settings;

/// The API mounted under `/api`, with request tracing and permissive CORS.
pub fn app<S, A>(store: Arc<S>, assistant: Arc<A>) -> Router
where
  S: PhenologyStore + 'static,
  A: Assistant + 'static,
{
  Router::new()
    .nest("/api", bloom_api::api_router(store, assistant))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use bloom_llm::{OpenAiClient, OpenAiConfig};
  use bloom_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn test_app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let assistant = OpenAiClient::new(OpenAiConfig::default()).unwrap();
    app(Arc::new(store), Arc::new(assistant))
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let app = test_app().await;

    let resp = app
      .clone()
      .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn chat_without_api_key_is_a_gateway_error() {
    let resp = test_app()
      .await
      .oneshot(
        Request::post("/api/chat")
          .header("content-type", "application/json")
          .body(Body::from(r#"{"message":"hello"}"#))
          .unwrap(),
      )
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "no API key configured");
    assert_eq!(body["kind"], "not_configured");
  }
}
