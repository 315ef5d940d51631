use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

/// Format used by the booking forms, e.g. `2024-05-01 14:30`.
pub const FORM_FORMAT: &str = "%Y-%m-%d %H:%M";
/// Format used on detail pages, e.g. `2024-05-01 14:30:00`.
pub const DETAIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

/// Parses a form time in the configured local offset into epoch seconds.
pub fn parse_form_time(value: &str, offset: &FixedOffset) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), FORM_FORMAT).ok()?;
    naive
        .and_local_timezone(*offset)
        .single()
        .map(|dt| dt.timestamp())
}

pub fn format_form_time(epoch: i64, offset: &FixedOffset) -> String {
    format_epoch(epoch, offset, FORM_FORMAT)
}

pub fn format_detail_time(epoch: i64, offset: &FixedOffset) -> String {
    format_epoch(epoch, offset, DETAIL_FORMAT)
}

fn format_epoch(epoch: i64, offset: &FixedOffset, fmt: &str) -> String {
    match DateTime::<Utc>::from_timestamp(epoch, 0) {
        Some(dt) => dt.with_timezone(offset).format(fmt).to_string(),
        None => epoch.to_string(),
    }
}

/// Parses `+08:00`, `-0530`, `+8` or `Z` style offsets.
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match value.chars().next()? {
        '+' => (1, &value[1..]),
        '-' => (-1, &value[1..]),
        _ => (1, value),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_char_boundary(2) => rest.split_at(2),
        None => (rest, "0"),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || !all_digits(minutes) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
