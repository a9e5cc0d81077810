//! Parsing of duration arguments
//!
//! Accepted forms:
//!
//! - `HH:MM:SS`, `HH:MM` and `D.HH:MM:SS` (time-span style)
//! - bare seconds, e.g. `3600`
//! - a number with a unit suffix: `s`, `m`, `h` or `d`, e.g. `90m`

use std::time::Duration;

/// Parse a duration, returning a human-readable message on failure
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let value = input.trim();
    if value.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    let duration = if value.contains(':') {
        parse_time_span(value)?
    } else if let Some(unit) = value.chars().last().filter(|c| c.is_ascii_alphabetic()) {
        let number = &value[..value.len() - 1];
        let amount: u64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration '{}'", input))?;
        let multiplier = match unit.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            other => return Err(format!("unknown duration unit '{}' in '{}'", other, input)),
        };
        Duration::from_secs(
            amount
                .checked_mul(multiplier)
                .ok_or_else(|| format!("duration '{}' is too large", input))?,
        )
    } else {
        Duration::from_secs(
            value
                .parse()
                .map_err(|_| format!("invalid duration '{}'", input))?,
        )
    };

    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(duration)
}

fn parse_time_span(value: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid time span '{}', expected [D.]HH:MM[:SS]", value);

    let (days, clock) = match value.split_once('.') {
        Some((days, clock)) if !days.contains(':') => {
            (days.parse::<u64>().map_err(|_| invalid())?, clock)
        }
        _ => (0, value),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let numbers = parts
        .iter()
        .map(|part| part.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, seconds) = match numbers.as_slice() {
        [h, m] => (*h, *m, 0),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }

    let too_large = || format!("duration '{}' is too large", value);
    let total = days
        .checked_mul(24)
        .and_then(|h| h.checked_add(hours))
        .and_then(|h| h.checked_mul(60 * 60))
        .and_then(|s| s.checked_add(minutes * 60 + seconds))
        .ok_or_else(too_large)?;

    Ok(Duration::from_secs(total))
}
