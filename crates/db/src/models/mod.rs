//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` entity struct matching the database
//! row and, where rows are written from outside the crate, an input DTO.

pub mod notification_fingerprint;
pub mod push_subscription;
pub mod timetable_entry;
pub mod user;
