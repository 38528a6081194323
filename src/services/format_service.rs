//! Display-string formatting for prices, changes, and clock times

use chrono::{DateTime, Local, Utc};

use crate::models::{ChangeDisplay, Trend};

/// Placeholder shown when a timestamp is absent or unparseable
pub const CLOCK_PLACEHOLDER: &str = "—";

/// Format a USD price for a card.
///
/// Values >= 1 get grouped thousands and exactly two decimals; values
/// below 1 keep up to six decimals (at least two) so sub-cent coins stay
/// readable. Non-finite input is coerced to 0 instead of propagated.
pub fn format_price(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    if value >= 1.0 {
        return group_thousands(&format!("{:.2}", value));
    }

    let fixed = format!("{:.6}", value);
    let trimmed = fixed.trim_end_matches('0');
    // '.' is always present after {:.6}
    let dot = trimmed.find('.').unwrap_or(trimmed.len());
    let decimals = trimmed.len().saturating_sub(dot + 1);
    if decimals >= 2 {
        trimmed.to_string()
    } else {
        format!("{:0<width$}", trimmed, width = dot + 3)
    }
}

/// Format a signed 24h change percentage.
/// A nonnegative value gets an explicit leading `+` and up styling.
pub fn format_change(value: f64) -> ChangeDisplay {
    let value = if value.is_finite() { value } else { 0.0 };
    // fold -0.0 into the nonnegative branch
    let value = if value == 0.0 { 0.0 } else { value };
    if value >= 0.0 {
        ChangeDisplay {
            text: format!("+{:.2}%", value),
            trend: Trend::Up,
        }
    } else {
        ChangeDisplay {
            text: format!("{:.2}%", value),
            trend: Trend::Down,
        }
    }
}

/// Local-time `HH:MM` for a card's last-updated line
pub fn format_clock_time(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.with_timezone(&Local).format("%H:%M").to_string(),
        None => CLOCK_PLACEHOLDER.to_string(),
    }
}

/// Insert `,` separators into the integer part of an already formatted
/// number string.
fn group_thousands(formatted: &str) -> String {
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted, None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let grouped = digits
        .chars()
        .rev()
        .collect::<String>()
        .as_bytes()
        .chunks(3)
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect::<String>();

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
