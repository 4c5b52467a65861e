//! Notification content for one (user, date) change-set.

use chrono::{Datelike, NaiveDate};
use vplan_core::calendar::to_date_number;
use vplan_core::fingerprint::DayFingerprint;
use vplan_events::PushPayload;

/// Tag suffix when a change-set has no hash.
const EMPTY_HASH_TAG: &str = "00000000";

/// Short German weekday, as shown in notification titles.
fn weekday_short(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Mo.",
        chrono::Weekday::Tue => "Di.",
        chrono::Weekday::Wed => "Mi.",
        chrono::Weekday::Thu => "Do.",
        chrono::Weekday::Fri => "Fr.",
        chrono::Weekday::Sat => "Sa.",
        chrono::Weekday::Sun => "So.",
    }
}

/// `Mo., 13.01.`
pub fn title_date(date: NaiveDate) -> String {
    format!("{}, {}", weekday_short(date), date.format("%d.%m."))
}

/// Build the visible notification for `day`.
///
/// The tag carries date and short hash so a newer change-set for the same
/// day replaces the older notification on the device.
pub fn build_payload(app_name: &str, day: NaiveDate, fingerprint: &DayFingerprint) -> PushPayload {
    let date_number = to_date_number(day);
    let short_hash = match fingerprint.short_hash() {
        "" => EMPTY_HASH_TAG,
        hash => hash,
    };

    PushPayload {
        title: format!("{app_name} · {}", title_date(day)),
        body: format!(
            "{} Änderung(en) betreffen deinen Stundenplan.",
            fingerprint.match_count
        ),
        url: format!("/stundenplan/dashboard?date={date_number}"),
        tag: format!("fds-sub-{date_number}-{short_hash}"),
    }
}
