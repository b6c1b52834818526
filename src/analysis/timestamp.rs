//! Canonicalization of raw punch timestamps to `YYYY-MM-DD HH:MM:SS`.
//!
//! Accepted shapes, as exported by the various clock terminals:
//! - `05/03/2024 8:45`, `05/03/24 08:45:12` (day first, 2-digit years are 20xx)
//! - `05-03-2024 08H45` (day first with dashes, `H` as separator)
//! - `2024-03-05 08:45:00` (already canonical)
//! - `2024-03-05T08:45:00`
//!
//! Normalization never fails. Input that cannot be mapped to a three-part date
//! is passed through as-is; rejecting it is the caller's decision.

use std::fmt;

const MIDNIGHT: &str = "00:00:00";

/// Characters some exports prepend or scatter in cells.
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Canonical date and time halves of a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTimestamp {
    pub date: String,
    pub time: String,
}

impl fmt::Display for NormalizedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.date.is_empty() {
            Ok(())
        } else {
            write!(f, "{} {}", self.date, self.time)
        }
    }
}

/// Normalize a raw timestamp. Returns an empty string when no date token exists.
pub fn normalize(raw: &str) -> String {
    normalize_parts(raw).to_string()
}

/// Normalize a raw timestamp, keeping date and time apart.
pub fn normalize_parts(raw: &str) -> NormalizedTimestamp {
    let cleaned: String = raw
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c) && *c != '"' && *c != '\'')
        .collect();

    let mut tokens = cleaned.split_whitespace();
    let (date_token, mut time_token) = match tokens.next() {
        Some(first) => split_iso_datetime(first),
        None => {
            return NormalizedTimestamp {
                date: String::new(),
                time: MIDNIGHT.to_string(),
            };
        }
    };
    if time_token.is_none() {
        time_token = tokens.next();
    }

    NormalizedTimestamp {
        date: normalize_date(date_token),
        time: time_token.map_or_else(|| MIDNIGHT.to_string(), normalize_time),
    }
}

/// `2024-03-05T08:45:00` -> (`2024-03-05`, `08:45:00`)
fn split_iso_datetime(token: &str) -> (&str, Option<&str>) {
    match token.split_once('T') {
        Some((date, time)) if date.contains(['-', '/']) && !time.is_empty() => (date, Some(time)),
        _ => (token, None),
    }
}

/// Normalize a date token to `YYYY-MM-DD`, best effort.
pub fn normalize_date(token: &str) -> String {
    let token = token.trim();

    if token.contains('/') {
        if let [day, month, year] = token.split('/').collect::<Vec<_>>()[..] {
            return format!("{}-{}-{}", expand_year(year), pad2(month), pad2(day));
        }
        return token.to_string();
    }

    if token.contains('-') {
        if let [first, second, third] = token.split('-').collect::<Vec<_>>()[..] {
            return if first.len() == 4 {
                format!("{first}-{}-{}", pad2(second), pad2(third))
            } else {
                format!("{}-{}-{}", expand_year(third), pad2(second), pad2(first))
            };
        }
    }

    token.to_string()
}

/// Normalize a time token to `HH:MM:SS`. Fewer than two components yields midnight.
pub fn normalize_time(token: &str) -> String {
    let unified: String = token
        .trim()
        .chars()
        .map(|c| if c == 'H' || c == 'h' { ':' } else { c })
        .collect();

    let parts: Vec<&str> = unified.split(':').collect();
    if parts.len() < 2 {
        return MIDNIGHT.to_string();
    }

    let seconds = parts.get(2).filter(|s| !s.trim().is_empty()).map_or_else(|| "00".to_string(), |s| pad2(s));
    format!("{}:{}:{seconds}", pad2(parts[0]), pad2(parts[1]))
}

fn pad2(component: &str) -> String {
    format!("{:0>2}", component.trim())
}

fn expand_year(year: &str) -> String {
    let year = year.trim();
    if year.len() == 2 {
        format!("20{year}")
    } else {
        year.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_first_slash() {
        assert_eq!(normalize("05/03/2024 08:45"), "2024-03-05 08:45:00");
        assert_eq!(normalize("5/3/24 8:45:07"), "2024-03-05 08:45:07");
    }

    #[test]
    fn test_day_first_dash_and_h_separator() {
        assert_eq!(normalize("05-03-2024 8H50"), "2024-03-05 08:50:00");
        assert_eq!(normalize("05-03-24 08h50"), "2024-03-05 08:50:00");
    }

    #[test]
    fn test_iso_passthrough() {
        assert_eq!(normalize("2024-03-05 17:20:00"), "2024-03-05 17:20:00");
        assert_eq!(normalize("2024-3-5 17:20"), "2024-03-05 17:20:00");
        assert_eq!(normalize("2024-03-05T17:20:00"), "2024-03-05 17:20:00");
    }

    #[test]
    fn test_strips_noise() {
        assert_eq!(normalize("\"\u{FEFF}05/03/2024 08:45\u{200B}\""), "2024-03-05 08:45:00");
        assert_eq!(normalize("  '05/03/2024'   '08:45'  "), "2024-03-05 08:45:00");
    }

    #[test]
    fn test_missing_or_short_time_is_midnight() {
        assert_eq!(normalize("05/03/2024"), "2024-03-05 00:00:00");
        assert_eq!(normalize("05/03/2024 8"), "2024-03-05 00:00:00");
        assert_eq!(normalize("05/03/2024 8H"), "2024-03-05 08:00:00");
    }

    #[test]
    fn test_malformed_date_passes_through() {
        assert_eq!(normalize("garbage 08:00"), "garbage 08:00:00");
        assert_eq!(normalize("05/2024 08:00"), "05/2024 08:00:00");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \u{200B} "), "");
    }

    #[test]
    fn test_idempotent_on_canonical_input() {
        for raw in ["05/03/2024 08:45", "05-03-24 8H50", "2024-12-31 23:59:59", "1/1/2025"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw}");
        }
    }
}
