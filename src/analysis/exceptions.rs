//! Matching of authorized absences against a day's theoretical schedule.
//!
//! When several windows qualify, the first one in input order wins.

use crate::models::AuthorizedAbsence;

/// The entry with neither start nor end time.
pub fn match_full_day<'a>(daily: &[&'a AuthorizedAbsence]) -> Option<&'a AuthorizedAbsence> {
    daily.iter().copied().find(|a| a.is_full_day())
}

/// A partial window `[start, end)` containing the theoretical entry.
pub fn match_morning<'a>(daily: &[&'a AuthorizedAbsence], theoretical_entry: i32) -> Option<&'a AuthorizedAbsence> {
    daily.iter().copied().find(|a| {
        a.window()
            .is_some_and(|(start, end)| start <= theoretical_entry && theoretical_entry < end)
    })
}

/// A partial window ending at or after the theoretical exit.
pub fn match_evening<'a>(daily: &[&'a AuthorizedAbsence], theoretical_exit: i32) -> Option<&'a AuthorizedAbsence> {
    daily
        .iter()
        .copied()
        .find(|a| a.window().is_some_and(|(_, end)| end >= theoretical_exit))
}
