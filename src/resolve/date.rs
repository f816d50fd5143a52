// src/resolve/date.rs

//! Date format mini-language used by `%Date%` and `%Date(<format>)%`.
//!
//! | Code   | Expands to                          |
//! |--------|-------------------------------------|
//! | `YYYY` | four-digit year                     |
//! | `YYY`  | day of the year                     |
//! | `YY`   | two-digit year                      |
//! | `MMMM` | month name (`October`)              |
//! | `MMM`  | abbreviated month name (`Oct`)      |
//! | `MM`   | zero-padded month number            |
//! | `M`    | month number                        |
//! | `DDDD` | weekday name (`Saturday`)           |
//! | `DDD`  | abbreviated weekday name (`Sat`)    |
//! | `DD`   | zero-padded day of month            |
//! | `D`    | day of month                        |
//! | `hha`  | 12-hour clock (`3:04PM`)            |
//! | `hh`   | zero-padded hour (24h)              |
//! | `h`    | hour (24h)                          |
//! | `mm`   | zero-padded minute                  |
//! | `m`    | zero-padded minute                  |
//! | `ss`   | zero-padded second                  |
//! | `s`    | second                              |
//! | `ms`   | milliseconds                        |
//!
//! Everything else is copied through unchanged.

use std::fmt::Display;

use chrono::{DateTime, Datelike, TimeZone, Timelike};

/// Format codes, longest first. At every position the first code that
/// matches wins, so `YYYY` is never read as `YY` + `YY`.
pub const FORMAT_CODES: [&str; 19] = [
    "YYYY", "MMMM", "DDDD", "YYY", "MMM", "DDD", "hha", "YY", "MM", "DD", "hh", "mm", "ss", "ms",
    "M", "D", "h", "m", "s",
];

/// Render `format` for the instant `tm`.
///
/// The format is scanned once from left to right; expanded text is never
/// scanned again, so month or weekday names cannot be corrupted by later
/// codes.
pub fn format_date<Tz>(tm: &DateTime<Tz>, format: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::with_capacity(format.len() + 16);
    let mut rest = format;

    'scan: while !rest.is_empty() {
        for code in FORMAT_CODES {
            if let Some(after) = rest.strip_prefix(code) {
                out.push_str(&expand(tm, code));
                rest = after;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

fn expand<Tz>(tm: &DateTime<Tz>, code: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match code {
        "YYYY" => tm.year().to_string(),
        "YYY" => tm.ordinal().to_string(),
        "YY" => format!("{:02}", tm.year().rem_euclid(100)),
        "MMMM" => tm.format("%B").to_string(),
        "MMM" => tm.format("%b").to_string(),
        "MM" => format!("{:02}", tm.month()),
        "M" => tm.month().to_string(),
        "DDDD" => tm.format("%A").to_string(),
        "DDD" => tm.format("%a").to_string(),
        "DD" => format!("{:02}", tm.day()),
        "D" => tm.day().to_string(),
        "hha" => tm.format("%-I:%M%p").to_string(),
        "hh" => format!("{:02}", tm.hour()),
        "h" => tm.hour().to_string(),
        "mm" | "m" => format!("{:02}", tm.minute()),
        "ss" => format!("{:02}", tm.second()),
        "s" => tm.second().to_string(),
        "ms" => (tm.nanosecond() / 1_000_000).min(999).to_string(),
        _ => code.to_string(),
    }
}
