/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A calendar date encoded as `YYYYMMDD` (e.g. `20250113`).
///
/// This is the date format the timetabling provider speaks and the key under
/// which notification fingerprints are stored.
pub type DateNumber = i32;
