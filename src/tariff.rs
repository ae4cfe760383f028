//! Time-of-use tariff period classification
//!
//! Maps a calendar date and a wall-clock time to one of the three 2.0TD
//! billing periods. The result depends on nothing but its inputs.

use crate::error::{Result, TarifaError};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date format used by the provider for readings
pub const READING_DATE_FORMAT: &str = "%Y/%m/%d";

/// National holidays, month/day only
const HOLIDAYS: &[(u32, u32)] = &[
    (1, 1),   // Año Nuevo
    (1, 6),   // Epifanía
    (3, 29),  // Viernes Santo 2024, kept as a fixed date
    (5, 1),   // Fiesta del Trabajo
    (8, 15),  // Asunción
    (10, 12), // Fiesta Nacional
    (11, 1),  // Todos los Santos
    (12, 6),  // Constitución
    (12, 25), // Navidad
];

/// Tariff period, P1 being the most expensive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    P1,
    P2,
    P3,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::P1, Period::P2, Period::P3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall-clock time as reported by the meter.
///
/// Hour 24 is representable and distinct from hour 0: the provider emits
/// both `"00:00"` and `"24:00"` and they are not deduplicated upstream.
/// Hours outside 0..=24 are kept as reported; the hour table sends them
/// to the fallback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

fn leading_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl FromStr for ClockTime {
    type Err = TarifaError;

    /// Only the hour must parse. Minutes default to 0 when absent or
    /// malformed, and trailing components such as seconds are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');
        let hour = parts
            .next()
            .and_then(leading_number)
            .ok_or_else(|| TarifaError::validation("time".to_string(), format!("no hour in '{}'", s)))?;
        let minute = parts.next().and_then(leading_number).unwrap_or(0);
        Ok(Self::new(hour, minute))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse a provider date (`YYYY/MM/DD`)
pub fn parse_reading_date(s: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s.trim(), READING_DATE_FORMAT)?)
}

pub fn is_holiday(date: NaiveDate) -> bool {
    HOLIDAYS.contains(&(date.month(), date.day()))
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Period for an hour of a working day
fn period_for_hour(hour: u32) -> Period {
    match hour {
        0..=8 => Period::P3,
        9..=10 => Period::P2,
        11..=14 => Period::P1,
        15..=18 => Period::P2,
        19..=22 => Period::P1,
        23..=24 => Period::P2,
        _ => Period::P3,
    }
}

/// Classify a reading into its tariff period.
///
/// Holidays win over weekends, which win over the hourly table.
pub fn classify(date: NaiveDate, time: ClockTime) -> Period {
    if is_holiday(date) || is_weekend(date) {
        return Period::P3;
    }
    period_for_hour(time.hour())
}

/// Classify from the provider's raw strings; `None` when either fails to parse
pub fn classify_raw(date: &str, time: &str) -> Option<Period> {
    let date = parse_reading_date(date).ok()?;
    let time = time.parse::<ClockTime>().ok()?;
    Some(classify(date, time))
}
