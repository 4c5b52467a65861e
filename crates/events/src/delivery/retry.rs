//! Delayed re-delivery of transiently failed pushes.
//!
//! The first attempt happens inline in the dispatch run. When it fails
//! transiently, the caller hands the device to [`RetryPolicy::redeliver`]
//! inside a detached task, so the backoff sleeps never occupy a dispatch
//! worker slot.

use std::time::Duration;

use vplan_core::backoff::{exponential_backoff_ms, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_DELAY_MS};

use super::push::{DeliveryOutcome, FailureKind, PushDispatcher, PushPayload, PushTarget};

/// Default total attempts per device, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry ceiling and backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per device, including the inline first attempt.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Whether any attempt is left after the inline first one.
    pub fn allows_retry(&self) -> bool {
        self.max_attempts > 1
    }

    /// Re-deliver after the inline attempt failed transiently.
    ///
    /// Attempts `2..=max_attempts`, sleeping a jittered backoff before each.
    /// Stops at the first success or non-transient failure. Exhausting the
    /// ceiling is logged and returns the last failure; nothing is mutated.
    pub async fn redeliver(
        &self,
        dispatcher: &PushDispatcher,
        target: &PushTarget,
        payload: Option<&PushPayload>,
    ) -> DeliveryOutcome {
        let mut last = DeliveryOutcome::Failed {
            kind: FailureKind::Transient,
            status_code: None,
            reason: "no retry attempts allowed".into(),
        };

        for attempt in 2..=self.max_attempts {
            let delay_ms = exponential_backoff_ms(attempt - 1, self.base_delay_ms, self.max_delay_ms);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            last = dispatcher.deliver(target, payload).await;
            if !last.is_retryable() {
                if last.is_delivered() {
                    tracing::info!(attempt, endpoint = %target.endpoint, "Push delivered on retry");
                }
                return last;
            }

            tracing::debug!(attempt, delay_ms, endpoint = %target.endpoint, "Push retry failed");
        }

        tracing::warn!(
            attempts = self.max_attempts,
            endpoint = %target.endpoint,
            outcome = ?last,
            "Push delivery dropped after retry ceiling"
        );
        last
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
