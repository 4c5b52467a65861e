//! Web push delivery.
//!
//! VAPID keys are loaded once at startup ([`vapid`]), handed to the
//! transport ([`transport`]) and injected into the [`push::PushDispatcher`].

pub mod push;
pub mod retry;
pub mod transport;
pub mod vapid;
