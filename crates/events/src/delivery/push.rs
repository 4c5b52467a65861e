//! Push delivery to a single device endpoint with failure classification.
//!
//! [`PushDispatcher::deliver`] never returns an error: every outcome is a
//! [`DeliveryOutcome`] telling the caller whether the device got the push,
//! whether the subscription must be pruned, and whether a retry makes sense.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

/// Lifetime of a push message in the push service, in seconds.
///
/// Substitution data goes stale quickly; minutes-scale is enough.
pub const PUSH_TTL_SECS: u32 = 120;

/// Default per-delivery timeout.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for push delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// VAPID keys are missing or unusable.
    #[error("Push delivery not configured: {0}")]
    NotConfigured(String),

    /// The message could not be built or encrypted.
    #[error("Could not build push message: {0}")]
    Message(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The push service did not answer within the delivery timeout.
    #[error("Push delivery timed out after {0:?}")]
    Timeout(Duration),

    /// The push service returned a non-2xx status code.
    #[error("Push service returned HTTP {0}")]
    HttpStatus(u16),
}

impl PushError {
    /// 404/410: the subscription no longer exists at the push service.
    pub fn is_permanent(&self) -> bool {
        matches!(self, PushError::HttpStatus(404 | 410))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            PushError::HttpStatus(status) => Some(*status),
            PushError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PushError::NotConfigured(_) => FailureKind::Configuration,
            e if e.is_permanent() => FailureKind::Permanent,
            _ => FailureKind::Transient,
        }
    }
}

// ---------------------------------------------------------------------------
// Targets, payloads and outcomes
// ---------------------------------------------------------------------------

/// Where to deliver: a browser push subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub endpoint: String,
    /// Client public key (URL-safe base64, uncompressed P-256 point).
    pub p256dh: String,
    /// Client auth secret (URL-safe base64).
    pub auth: String,
}

/// Notification content shown by the service worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
    pub tag: String,
}

/// How a failed delivery should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Push is not configured; neither retry nor prune.
    Configuration,
    /// Network, timeout, 5xx or other non-2xx: retry later.
    Transient,
    /// Endpoint gone (404/410): prune the subscription.
    Permanent,
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed {
        kind: FailureKind,
        status_code: Option<u16>,
        reason: String,
    },
}

impl DeliveryOutcome {
    fn from_error(error: &PushError) -> Self {
        DeliveryOutcome::Failed {
            kind: error.kind(),
            status_code: error.status_code(),
            reason: error.to_string(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    /// Whether the caller must delete the subscription.
    pub fn should_remove(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Failed {
                kind: FailureKind::Permanent,
                ..
            }
        )
    }

    /// Whether a delayed retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Failed {
                kind: FailureKind::Transient,
                ..
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// Sends one push message and reports the push service's HTTP status.
///
/// Implementations return `Ok(status)` for any HTTP answer; classification
/// happens in [`PushDispatcher`].
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, target: &PushTarget, payload: Option<&[u8]>) -> Result<u16, PushError>;
}

// ---------------------------------------------------------------------------
// PushDispatcher
// ---------------------------------------------------------------------------

/// Delivers payloads to device endpoints through an injected transport.
///
/// A dispatcher without transport (VAPID not configured) reports a
/// configuration failure for every delivery.
#[derive(Clone)]
pub struct PushDispatcher {
    transport: Option<Arc<dyn PushTransport>>,
    timeout: Duration,
}

impl PushDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, timeout: Duration) -> Self {
        Self {
            transport: Some(transport),
            timeout,
        }
    }

    /// A dispatcher for a process without VAPID keys.
    pub fn unconfigured() -> Self {
        Self {
            transport: None,
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Deliver `payload` (or an empty tickle when `None`) to one device.
    pub async fn deliver(&self, target: &PushTarget, payload: Option<&PushPayload>) -> DeliveryOutcome {
        match self.try_deliver(target, payload).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                tracing::debug!(endpoint = %target.endpoint, error = %e, "Push delivery failed");
                DeliveryOutcome::from_error(&e)
            }
        }
    }

    async fn try_deliver(
        &self,
        target: &PushTarget,
        payload: Option<&PushPayload>,
    ) -> Result<(), PushError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| PushError::NotConfigured("VAPID keys missing".into()))?;

        let body = payload
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| PushError::Message(e.to_string()))?;

        let status = tokio::time::timeout(self.timeout, transport.send(target, body.as_deref()))
            .await
            .map_err(|_| PushError::Timeout(self.timeout))??;

        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(PushError::HttpStatus(status))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
