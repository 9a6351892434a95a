//! Error type for `bloom-llm`.

use bloom_core::assistant::{ClassifyFailure, FailureKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no API key configured")]
  MissingApiKey,

  #[error("API key is malformed: expected an \"sk-\" prefix and at least 20 characters")]
  InvalidApiKey,

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The provider answered with a non-success status.
  #[error("provider returned {status}: {message}")]
  Provider {
    status:  u16,
    kind:    ProviderErrorKind,
    message: String,
  },

  #[error("provider reply contained no choices")]
  EmptyReply,
}

/// Coarse classification of provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
  /// The key was rejected.
  Unauthorized,
  RateLimited,
  QuotaExceeded,
  Other,
}

impl ProviderErrorKind {
  pub fn classify(status: u16, code: Option<&str>) -> Self {
    match (status, code) {
      (_, Some("insufficient_quota")) => Self::QuotaExceeded,
      (401 | 403, _) | (_, Some("invalid_api_key")) => Self::Unauthorized,
      (429, _) | (_, Some("rate_limit_exceeded")) => Self::RateLimited,
      _ => Self::Other,
    }
  }
}

impl ClassifyFailure for Error {
  fn failure_kind(&self) -> FailureKind {
    match self {
      Error::MissingApiKey | Error::InvalidApiKey => FailureKind::NotConfigured,
      Error::Provider { kind, .. } => match kind {
        ProviderErrorKind::Unauthorized => FailureKind::Unauthorized,
        ProviderErrorKind::RateLimited => FailureKind::RateLimited,
        ProviderErrorKind::QuotaExceeded => FailureKind::QuotaExceeded,
        ProviderErrorKind::Other => FailureKind::Unavailable,
      },
      Error::Http(_) | Error::EmptyReply => FailureKind::Unavailable,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
