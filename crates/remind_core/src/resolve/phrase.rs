use crate::error::AppError;
use crate::model::parse_weekday;
use crate::resolve::DateParser;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time};

const DEFAULT_HOUR: u8 = 9;
const EVENING_HOUR: u8 = 20;

/// Small English phrase parser.
///
/// Understands clock times (`17:30`, `5pm`, `5:30 pm`, `noon`), day words
/// (`today`, `tonight`, `tomorrow`, weekday names), ISO dates
/// (`2025-12-24`) and relative offsets (`in 20 minutes`, `in 2 days`).
///
/// A relative offset wins over day words and dates. An offset in days or
/// weeks keeps an explicit clock time (`in 2 days at 17:00`); an offset in
/// minutes or hours ignores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseParser;

#[derive(Debug, Default)]
struct Found {
    date: Option<Date>,
    time: Option<Time>,
    offset: Option<Duration>,
    offset_in_days: bool,
    weekday_date: bool,
}

impl DateParser for PhraseParser {
    fn parse(&self, text: &str, now: OffsetDateTime) -> Result<Option<OffsetDateTime>, AppError> {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|word| {
                word.trim_matches(|ch: char| matches!(ch, ',' | '.' | ';' | '!' | '?'))
                    .to_ascii_lowercase()
            })
            .filter(|word| !word.is_empty())
            .collect();

        let found = scan(&words, now)?;

        if let Some(offset) = found.offset {
            let shifted = now.checked_add(offset).ok_or_else(out_of_range)?;
            return Ok(Some(match found.time {
                Some(time) if found.offset_in_days => shifted.replace_time(time),
                _ => shifted,
            }));
        }

        if found.date.is_none() && found.time.is_none() {
            return Ok(None);
        }

        let today = now.date();
        let time = match found.time {
            Some(time) => time,
            None => Time::from_hms(DEFAULT_HOUR, 0, 0)
                .map_err(|err| AppError::invalid_data(err.to_string()))?,
        };
        let mut date = found.date.unwrap_or(today);
        if found.weekday_date && date == today && time <= now.time() {
            date = date.checked_add(Duration::weeks(1)).ok_or_else(out_of_range)?;
        }

        Ok(Some(
            PrimitiveDateTime::new(date, time).assume_offset(now.offset()),
        ))
    }
}

fn scan(words: &[String], now: OffsetDateTime) -> Result<Found, AppError> {
    let today = now.date();
    let mut found = Found::default();
    let mut index = 0;

    while index < words.len() {
        let word = words[index].as_str();
        let next = words.get(index + 1).map(String::as_str);

        if word == "in"
            && let Some((amount, unit)) =
                relative_offset(next, words.get(index + 2).map(String::as_str))
        {
            let seconds = amount
                .checked_mul(unit.whole_seconds())
                .ok_or_else(out_of_range)?;
            found.offset = Some(Duration::seconds(seconds));
            found.offset_in_days = unit >= Duration::DAY;
            index += 3;
            continue;
        }

        match word {
            "today" => found.date = Some(today),
            "tomorrow" => found.date = Some(today.next_day().ok_or_else(out_of_range)?),
            "tonight" => {
                found.date = Some(today);
                if found.time.is_none() {
                    found.time = Some(clock_time(EVENING_HOUR, 0, word)?);
                }
            }
            "noon" | "midday" => found.time = Some(clock_time(12, 0, word)?),
            _ => {
                if let Some(weekday) = full_weekday(word) {
                    let mut date = today;
                    while date.weekday() != weekday {
                        date = date.next_day().ok_or_else(out_of_range)?;
                    }
                    found.date = Some(date);
                    found.weekday_date = true;
                } else if looks_like_iso_date(word) {
                    let date = Date::parse(word, format_description!("[year]-[month]-[day]"))
                        .map_err(|_| {
                            AppError::invalid_input(format!(
                                "invalid date '{word}' (use YYYY-MM-DD)"
                            ))
                        })?;
                    found.date = Some(date);
                } else if let Some(time) = meridiem_time(word, next)? {
                    found.time = Some(time.0);
                    index += time.1;
                } else if looks_like_clock(word) {
                    found.time = Some(parse_clock(word)?);
                }
            }
        }

        index += 1;
    }

    Ok(found)
}

fn full_weekday(word: &str) -> Option<time::Weekday> {
    // Abbreviations collide with ordinary words ("sun", "sat"), so only full
    // names count inside free text.
    if word.len() < 6 {
        return None;
    }
    parse_weekday(word)
}

fn out_of_range() -> AppError {
    AppError::invalid_input("time is out of range")
}

/// `in <amount> <unit>` as the amount and the length of one unit.
fn relative_offset(amount: Option<&str>, unit: Option<&str>) -> Option<(i64, Duration)> {
    let amount: i64 = match amount? {
        "a" | "an" => 1,
        value => value.parse().ok()?,
    };
    if amount <= 0 {
        return None;
    }

    let unit = match unit? {
        "minute" | "minutes" | "min" | "mins" => Duration::MINUTE,
        "hour" | "hours" | "hr" | "hrs" => Duration::HOUR,
        "day" | "days" => Duration::DAY,
        "week" | "weeks" => Duration::WEEK,
        _ => return None,
    };
    Some((amount, unit))
}

fn looks_like_iso_date(word: &str) -> bool {
    let parts: Vec<&str> = word.split('-').collect();
    parts.len() == 3
        && parts[0].len() == 4
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

fn looks_like_clock(word: &str) -> bool {
    match word.split_once(':') {
        Some((hours, minutes)) => {
            (1..=2).contains(&hours.len())
                && !minutes.is_empty()
                && hours.chars().all(|ch| ch.is_ascii_digit())
                && minutes.chars().all(|ch| ch.is_ascii_digit())
        }
        None => false,
    }
}

fn parse_clock(word: &str) -> Result<Time, AppError> {
    let invalid = || AppError::invalid_input(format!("invalid time '{word}' (use HH:MM, 24-hour)"));
    let (hours, minutes) = word.split_once(':').ok_or_else(invalid)?;
    if minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    Time::from_hms(hours, minutes, 0).map_err(|_| invalid())
}

/// `5pm`, `5:30pm`, or `5` / `5:30` followed by a separate `am`/`pm` word.
/// Returns the time and how many extra words were consumed.
fn meridiem_time(word: &str, next: Option<&str>) -> Result<Option<(Time, usize)>, AppError> {
    let (clock, suffix, consumed) = if let Some(clock) = word.strip_suffix("am") {
        (clock, "am", 0)
    } else if let Some(clock) = word.strip_suffix("pm") {
        (clock, "pm", 0)
    } else if let Some(suffix @ ("am" | "pm")) = next {
        (word, suffix, 1)
    } else {
        return Ok(None);
    };

    if clock.is_empty() || !clock.chars().all(|ch| ch.is_ascii_digit() || ch == ':') {
        return Ok(None);
    }

    let shown = if consumed == 1 {
        format!("{word} {suffix}")
    } else {
        word.to_string()
    };
    let invalid = || AppError::invalid_input(format!("invalid time '{shown}'"));
    let (hours, minutes) = match clock.split_once(':') {
        Some((hours, minutes)) if minutes.len() == 2 => (hours, minutes),
        Some(_) => return Err(invalid()),
        None => (clock, "00"),
    };
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hours) {
        return Err(invalid());
    }

    let hours = match (hours, suffix) {
        (12, "am") => 0,
        (12, _) => 12,
        (hours, "pm") => hours + 12,
        (hours, _) => hours,
    };

    let time = Time::from_hms(hours, minutes, 0).map_err(|_| invalid())?;
    Ok(Some((time, consumed)))
}

fn clock_time(hours: u8, minutes: u8, word: &str) -> Result<Time, AppError> {
    Time::from_hms(hours, minutes, 0)
        .map_err(|_| AppError::invalid_data(format!("bad built-in time for '{word}'")))
}
