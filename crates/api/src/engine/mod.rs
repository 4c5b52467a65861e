//! Substitution dispatch engine.
//!
//! A dispatch run loads the users due for notifications, fetches the
//! substitution rows for every date they look ahead to, and processes users
//! concurrently on a bounded pool: match, fingerprint, decide, deliver to
//! every device, persist.

pub mod dispatcher;
pub mod payload;
pub mod store;

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;

pub use dispatcher::{
    DeviceFilter, DispatchEngine, DispatchError, DispatchOptions, DispatchRun, DispatchSummary,
};
pub use store::{DispatchStore, PgDispatchStore, PruneOutcome, Recipient, StoreError};

/// Current wall-clock time in `tz`, used for the push window and school days.
pub fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}
