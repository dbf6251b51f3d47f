//! Shared primitive types used across the entire registry.

use chrono::{DateTime, Utc};

/// A stable, unique identifier for any resource in the registry.
pub type ResourceId = String;

/// Wall-clock instant attached to status changes and notifications.
pub type Timestamp = DateTime<Utc>;

/// Render a timestamp the way the report stream shows it.
pub fn clock_time(at: &Timestamp) -> String {
    at.format("%H:%M:%S").to_string()
}
