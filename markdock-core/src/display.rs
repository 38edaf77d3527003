use chrono::{DateTime, Utc};

pub fn time_ago(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - published).num_seconds();
    if seconds < 60 {
        return "Just now".to_owned();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

/// Label for the cache indicator; `None` while nothing has been cached.
pub fn cache_age_label(minutes: i64) -> Option<String> {
    match minutes {
        m if m < 0 => None,
        0 => Some("Just updated".to_owned()),
        m => Some(format!("Updated {m}m ago")),
    }
}
