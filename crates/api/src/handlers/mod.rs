//! Request handlers.
//!
//! Handlers stay thin: they parse query and body, delegate to `vplan_core`
//! or the dispatch engine, and map errors via [`AppError`](crate::error::AppError).

pub mod dispatch;
pub mod push;
pub mod timetable;
pub mod users;
