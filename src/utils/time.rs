use chrono::{DateTime, Utc};

/// Wall-clock now. Operation timestamps use chrono so they serialize
/// cleanly; the dedup cooldown uses the runtime's monotonic clock instead.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as a human-readable date and time
pub fn format_datetime(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the elapsed time of a finished operation (e.g. "3.4s")
pub fn format_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let millis = (end - start).num_milliseconds().max(0);
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.1}s", millis as f64 / 1000.0)
    }
}
