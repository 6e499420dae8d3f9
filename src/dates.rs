use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::note::Note;

pub const TODAY: &str = "Today";
pub const YESTERDAY: &str = "Yesterday";

/// Converts a millisecond timestamp into `tz`. Timestamps chrono cannot
/// represent fall back to the Unix epoch.
pub fn zoned<Tz: TimeZone>(millis: i64, tz: &Tz) -> DateTime<Tz> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(tz)
}

/// Relative day label for `timestamp` as seen from `now`: "Today",
/// "Yesterday", or a date such as "Mon, 23 Feb 2026".
///
/// Compares calendar days in `now`'s time zone, never elapsed time, so
/// 23:59 yesterday and 00:01 today always land in different groups.
pub fn date_label<Tz: TimeZone>(timestamp: i64, now: &DateTime<Tz>) -> String {
    let day = zoned(timestamp, &now.timezone()).date_naive();
    let today = now.date_naive();

    if day == today {
        TODAY.to_string()
    } else if today.pred_opt() == Some(day) {
        YESTERDAY.to_string()
    } else {
        day.format("%a, %-d %b %Y").to_string()
    }
}

// "14:05", or "edited 14:07" once the text has changed
pub fn time_caption<Tz>(note: &Note, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    if note.is_edited() {
        format!("edited {}", clock_time(note.updated_at, tz))
    } else {
        clock_time(note.created_at, tz)
    }
}

fn clock_time<Tz>(millis: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    zoned(millis, tz).format("%H:%M").to_string()
}
