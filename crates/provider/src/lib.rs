//! Upstream timetabling provider (WebUntis substitution monitor).
//!
//! - [`SubstitutionSource`] -- the seam the dispatch engine depends on.
//! - [`UntisClient`] -- the HTTP implementation.
//! - [`ProviderConfig`] -- school slug and validated base URL.

pub mod config;
pub mod untis;

pub use config::ProviderConfig;
pub use untis::UntisClient;

use async_trait::async_trait;
use vplan_core::substitution::SubstitutionRow;
use vplan_core::types::DateNumber;

/// Errors from the upstream provider layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The base URL is not an HTTPS `*.webuntis.com` URL.
    #[error("Invalid provider configuration: {0}")]
    Config(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider returned status {status}")]
    Status { status: u16 },

    /// The provider answered with something other than JSON.
    #[error("Provider response is not JSON (content-type: {content_type})")]
    NotJson { content_type: String },

    /// The JSON body did not have the expected row shape.
    #[error("Malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of raw substitution rows for a date.
///
/// Implementations are expected to be slow or unreliable; callers bound
/// each call with their own timeout.
#[async_trait]
pub trait SubstitutionSource: Send + Sync {
    async fn fetch_rows(&self, date: DateNumber) -> Result<Vec<SubstitutionRow>, ProviderError>;
}
