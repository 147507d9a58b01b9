//! Turns free text into a scheduled instant and computes recurrences.

mod phrase;

pub use phrase::PhraseParser;

use crate::clock::truncate_to_minute;
use crate::error::AppError;
use crate::model::Repeat;
use time::{Duration, OffsetDateTime};

/// Natural-language date/time extraction, a pure function of text and "now".
///
/// `Ok(None)` means the text holds no temporal expression; `Err` is reserved
/// for something that looks like a time but is malformed.
pub trait DateParser: Send + Sync {
    fn parse(&self, text: &str, now: OffsetDateTime) -> Result<Option<OffsetDateTime>, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub scheduled_at: Option<OffsetDateTime>,
    pub description: String,
}

/// The description keeps the whole phrase, time words included.
pub fn resolve(
    parser: &dyn DateParser,
    remaining_text: &str,
    now: OffsetDateTime,
) -> Result<Resolution, AppError> {
    let scheduled_at = parser
        .parse(remaining_text, now)?
        .map(|at| truncate_to_minute(at.to_offset(now.offset())));

    Ok(Resolution {
        scheduled_at,
        description: remaining_text.to_string(),
    })
}

pub fn next_occurrence(
    scheduled_at: OffsetDateTime,
    repeat: Option<&Repeat>,
) -> Option<OffsetDateTime> {
    match repeat? {
        Repeat::Hourly => scheduled_at.checked_add(Duration::HOUR),
        Repeat::Daily => scheduled_at.checked_add(Duration::DAY),
        Repeat::Weekly => scheduled_at.checked_add(Duration::WEEK),
        Repeat::On(weekday) => {
            let mut next = scheduled_at.checked_add(Duration::DAY)?;
            while next.weekday() != *weekday {
                next = next.checked_add(Duration::DAY)?;
            }
            Some(next)
        }
        Repeat::Other(_) => None,
    }
}

/// Steps forward at least once, then keeps stepping until strictly after
/// `now`.
pub fn next_future_occurrence(
    scheduled_at: OffsetDateTime,
    repeat: Option<&Repeat>,
    now: OffsetDateTime,
) -> Option<OffsetDateTime> {
    let first = next_occurrence(scheduled_at, repeat)?;
    if first > now {
        return Some(first);
    }

    // Every rule has a fixed period once it is on its first occurrence.
    let period = next_occurrence(first, repeat)? - first;
    let behind = now - first;
    let steps = behind.whole_seconds() / period.whole_seconds() + 1;
    let jump = period.whole_seconds().checked_mul(steps)?;
    first.checked_add(Duration::seconds(jump))
}

/// Moves a weekday-tagged first occurrence onto that weekday.
pub fn align_to_repeat(
    scheduled_at: OffsetDateTime,
    repeat: Option<&Repeat>,
) -> Result<OffsetDateTime, AppError> {
    match repeat {
        Some(Repeat::On(weekday)) => {
            let mut aligned = scheduled_at;
            while aligned.weekday() != *weekday {
                aligned = aligned
                    .checked_add(Duration::DAY)
                    .ok_or_else(|| AppError::invalid_input("time is out of range"))?;
            }
            Ok(aligned)
        }
        _ => Ok(scheduled_at),
    }
}

/// First delivery instant for a freshly added task. Recurring tasks never
/// start in the past; one-shot tasks keep whatever was asked for.
pub fn initial_schedule(
    scheduled_at: OffsetDateTime,
    repeat: Option<&Repeat>,
    now: OffsetDateTime,
) -> Result<OffsetDateTime, AppError> {
    let aligned = align_to_repeat(scheduled_at, repeat)?;
    if aligned > now {
        return Ok(aligned);
    }
    Ok(next_future_occurrence(aligned, repeat, now).unwrap_or(aligned))
}
