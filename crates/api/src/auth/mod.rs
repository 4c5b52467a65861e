//! Authentication primitives.
//!
//! - [`signature`] -- Signed-trigger verification with rotating HS256 keys.

pub mod signature;
