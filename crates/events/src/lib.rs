//! Outbound notification delivery.
//!
//! - [`PushDispatcher`] -- delivers one payload to one browser push endpoint
//!   and classifies the result (delivered, transient, permanent, not
//!   configured).
//! - [`WebPushTransport`] -- Web Push protocol transport with VAPID.
//! - [`RetryPolicy`] -- delayed re-delivery of transient failures using the
//!   jittered backoff from `vplan_core::backoff`.

pub mod delivery;

pub use delivery::push::{
    DeliveryOutcome, FailureKind, PushDispatcher, PushError, PushPayload, PushTarget,
    PushTransport,
};
pub use delivery::retry::RetryPolicy;
pub use delivery::vapid::{VapidConfig, VapidKeys};
pub use delivery::transport::WebPushTransport;
