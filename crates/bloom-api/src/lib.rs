//! JSON REST API for Bloom.
//!
//! Exposes an axum [`Router`] backed by any
//! [`bloom_core::store::PhenologyStore`] and any
//! [`bloom_core::assistant::Assistant`]. Transport concerns (CORS, tracing,
//! TLS) are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bloom_api::api_router(store, assistant))
//! ```

pub mod areas;
pub mod assist;
pub mod error;
pub mod prompt;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::FromRef,
  routing::{get, post},
};
use bloom_core::{assistant::Assistant, store::PhenologyStore};
use serde_json::{Value, json};

pub use error::ApiError;

/// Shared handler state. Handlers extract the half they need through
/// [`FromRef`].
pub struct AppState<S, A> {
  pub store:     Arc<S>,
  pub assistant: Arc<A>,
}

impl<S, A> Clone for AppState<S, A> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), assistant: self.assistant.clone() }
  }
}

impl<S, A> FromRef<AppState<S, A>> for Arc<S> {
  fn from_ref(state: &AppState<S, A>) -> Self { state.store.clone() }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, A>(store: Arc<S>, assistant: Arc<A>) -> Router<()>
where
  S: PhenologyStore + 'static,
  A: Assistant + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Areas
    .route("/areas", get(areas::list::<S>).post(areas::create::<S>))
    .route("/areas/{id}", get(areas::get_one::<S>).delete(areas::delete_one::<S>))
    // Assistant
    .route("/areas/{id}/describe", post(assist::describe::<S, A>))
    .route("/areas/{id}/ask", post(assist::ask::<S, A>))
    .route("/chat", post(assist::chat::<S, A>))
    .with_state(AppState { store, assistant })
}

/// `GET /health`
async fn health() -> Json<Value> {
  Json(json!({
    "status": "healthy",
    "service": "bloom",
    "version": env!("CARGO_PKG_VERSION"),
  }))
}
