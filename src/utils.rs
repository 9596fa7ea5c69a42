use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Capture time with microsecond precision, as printed in reports and tables.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

pub fn offset_millis(base: &DateTime<Utc>, timestamp: &DateTime<Utc>) -> f64 {
    (*timestamp - *base)
        .num_microseconds()
        .map(|us| us as f64 / 1_000.0)
        .unwrap_or_default()
}

pub fn offset_seconds(base: &DateTime<Utc>, timestamp: &DateTime<Utc>) -> f64 {
    offset_millis(base, timestamp) / 1_000.0
}

/// Chart label for a domain: names with more than three labels keep their
/// first two followed by `...`.
pub fn short_domain_label(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 3 {
        format!("{}...", labels[..2].join("."))
    } else {
        domain.to_string()
    }
}
