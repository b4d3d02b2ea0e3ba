// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current time as RFC3339.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

/// Format epoch milliseconds as RFC3339, or `None` if out of range.
pub fn format_epoch_ms(ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(format_utc_rfc3339)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_epoch_ms() {
        assert_eq!(
            format_epoch_ms(1_700_000_000_000).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
    }
}
