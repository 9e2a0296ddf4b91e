//! Timestamp utilities

use chrono::{DateTime, Local, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Local wall-clock stamp used in checkpoint file names (`20241125_184726`)
pub fn checkpoint_stamp() -> String {
    format_stamp(&Local::now())
}

/// Format a timestamp the way checkpoint file names expect
pub fn format_stamp<Tz: chrono::TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%Y%m%d_%H%M%S").to_string()
}
