//! Wall-clock time of day, stored as minutes since midnight.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Time of day with minute resolution, serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Build from hour and minute. Returns `None` outside 00:00..=23:59.
    pub const fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour > 23 || minute > 59 {
            None
        } else {
            Some(Self(hour * 60 + minute))
        }
    }

    /// Build from hour and minute known to be valid at compile time.
    pub(crate) const fn hm(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    /// Minutes since midnight.
    pub const fn minutes(self) -> i32 {
        self.0 as i32
    }

    /// Parse `H:MM`, `HH:MM` or `HH:MM:SS` (seconds are truncated).
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().split(':');
        let hour = parts.next()?.trim().parse::<u16>().ok()?;
        let minute = parts.next()?.trim().parse::<u16>().ok()?;
        if let Some(second) = parts.next() {
            let second = second.trim().parse::<u16>().ok()?;
            if second > 59 {
                return None;
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Self::from_hm(hour, minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AppError::parse(format!("Invalid time of day '{s}'")))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day '{raw}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!(ClockTime::parse("8:05"), ClockTime::from_hm(8, 5));
        assert_eq!(ClockTime::parse("08:05:59"), ClockTime::from_hm(8, 5));
        assert_eq!(ClockTime::parse(" 17:30 ").map(ClockTime::minutes), Some(1050));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ClockTime::parse("").is_none());
        assert!(ClockTime::parse("24:00").is_none());
        assert!(ClockTime::parse("12:60").is_none());
        assert!(ClockTime::parse("ab:cd").is_none());
        assert!(ClockTime::parse("12").is_none());
        assert!(ClockTime::parse("12:00:00:00").is_none());
    }

    #[test]
    fn test_display_and_serde() {
        let t = ClockTime::hm(9, 0);
        assert_eq!(t.to_string(), "09:00");
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:00\"");
        let back: ClockTime = serde_json::from_str("\"13:05\"").unwrap();
        assert_eq!(back, ClockTime::hm(13, 5));
        assert!(serde_json::from_str::<ClockTime>("\"nope\"").is_err());
    }
}
