use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};

/// Relative "last edited" text for list views. Thresholds compare whole
/// elapsed minutes, hours and days; clock times render in `tz`.
pub fn last_edited_label<Tz>(updated_at: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let elapsed = now.signed_duration_since(updated_at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();
    let local = updated_at.with_timezone(tz);

    if minutes < 1 {
        "Just now".into()
    } else if minutes < 60 {
        format!("{minutes} min ago")
    } else if hours < 24 {
        format!("Today · {}", local.format("%H:%M"))
    } else if days == 1 {
        format!("Yesterday · {}", local.format("%H:%M"))
    } else if days < 7 {
        format!("{days} days ago")
    } else {
        local.format("%b %-d").to_string()
    }
}
