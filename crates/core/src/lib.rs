//! Domain logic for the substitution-plan push notifier.
//!
//! Pure, I/O-free building blocks shared by the database, provider, delivery
//! and API crates:
//!
//! - [`calendar`] -- school days, ISO week parity, lookahead and dispatch window.
//! - [`timetable`] -- normalization, validation and conflict detection of a
//!   user's recurring timetable.
//! - [`substitution`] -- cleaning and classification of provider rows.
//! - [`matching`] -- substitution rows against timetable entries for a date.
//! - [`fingerprint`] -- canonical change-set keys, hashing, delta decision.
//! - [`backoff`] -- jittered exponential retry delays.

pub mod backoff;
pub mod calendar;
pub mod error;
pub mod fingerprint;
pub mod hashing;
pub mod matching;
pub mod substitution;
pub mod timetable;
pub mod types;
