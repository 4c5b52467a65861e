//! Request extractors that guard handlers.
//!
//! - [`signature::SignedTrigger`] -- Buffers the body and verifies the trigger signature.

pub mod signature;
