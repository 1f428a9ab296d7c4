//! Percentage label → fill style.

use serde::Serialize;

pub const GRAY: &str = "#9E9E9E";
pub const TEAL: &str = "#4CA09C";
pub const BLUE: &str = "#2B6CB0";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FillStyle {
    pub color: &'static str,
    pub opacity: f64,
}

const EMPTY: FillStyle = FillStyle { color: GRAY, opacity: 0.1 };
const LOW: FillStyle = FillStyle { color: TEAL, opacity: 0.22 };
const MEDIUM: FillStyle = FillStyle { color: TEAL, opacity: 0.4 };
const HIGH: FillStyle = FillStyle { color: TEAL, opacity: 0.6 };
const FULL: FillStyle = FillStyle { color: BLUE, opacity: 0.6 };

// Same values as LOW but a separate constant: labels that don't parse land here,
// not in the 1-30 range.
pub const FALLBACK: FillStyle = FillStyle { color: TEAL, opacity: 0.22 };

/// Leading integer of a label such as `"25%"`. Anything above 100 is not a
/// percentage.
pub fn parse_percent(label: &str) -> Option<u8> {
    let trimmed = label.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let value: u32 = trimmed[..digits_end].parse().ok()?;
    u8::try_from(value).ok().filter(|p| *p <= 100)
}

pub fn classify_percent(percent: u8) -> Option<FillStyle> {
    match percent {
        0 => Some(EMPTY),
        1..=30 => Some(LOW),
        31..=70 => Some(MEDIUM),
        71..=99 => Some(HIGH),
        100 => Some(FULL),
        _ => None,
    }
}

pub fn classify(label: &str) -> FillStyle {
    parse_percent(label)
        .and_then(classify_percent)
        .unwrap_or(FALLBACK)
}
