use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};

/// All feed timestamps are interpreted in KST regardless of host timezone.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("KST offset is valid")
}

/// Current wall-clock time in KST.
pub fn kst_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&kst())
}

/// Extract the first run of decimal digits from a phrase.
/// "30분 전" -> Some(30), "방금 전" -> None.
fn leading_number(s: &str) -> Option<i64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Render a timestamp as the cafe-style clock label, e.g. "오후 3:07".
/// 12-hour clock: midnight and noon both display as 12.
fn clock_label(dt: DateTime<FixedOffset>) -> String {
    let hour24 = dt.hour();
    let marker = if hour24 < 12 { "오전" } else { "오후" };
    let hour = match hour24 {
        0 => 12,
        h if h <= 12 => h,
        h => h - 12,
    };
    format!("{} {}:{:02}", marker, hour, dt.minute())
}

/// Convert a relative time phrase from the feed ("방금 전", "30분 전",
/// "2시간 전", "3일 전") into an absolute clock label, anchored at `now`.
///
/// Unrecognized phrases and failed number extraction both degrade to `now`;
/// this function never fails.
pub fn format_relative_time(raw: &str, now: DateTime<FixedOffset>) -> String {
    let raw = raw.trim();

    let dt = if raw.contains("방금") {
        now
    } else if raw.contains("분 전") {
        leading_number(raw).map_or(now, |n| now - Duration::minutes(n))
    } else if raw.contains("시간 전") {
        leading_number(raw).map_or(now, |n| now - Duration::hours(n))
    } else if raw.contains("일 전") {
        leading_number(raw).map_or(now, |n| now - Duration::days(n))
    } else {
        now
    };

    clock_label(dt)
}
