//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod notification_fingerprint_repo;
pub mod push_subscription_repo;
pub mod timetable_entry_repo;
pub mod user_repo;

pub use notification_fingerprint_repo::NotificationFingerprintRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use timetable_entry_repo::TimetableEntryRepo;
pub use user_repo::UserRepo;
