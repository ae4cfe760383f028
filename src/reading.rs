//! Meter reading data model
//!
//! Readings arrive from the provider as loosely typed JSON. Decoding is
//! lenient: a malformed field never rejects the reading, and a malformed
//! reading never rejects the batch.

use crate::tariff::Period;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Deref;

/// Why a reading was excluded from numeric totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingFlag {
    MissingDate,
    InvalidDate,
    MissingTime,
    InvalidTime,
}

impl ReadingFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingDate => "missing date",
            Self::InvalidDate => "invalid date",
            Self::MissingTime => "missing time",
            Self::InvalidTime => "invalid time",
        }
    }
}

/// Textual field kept exactly as the provider sent it.
///
/// Strings are exposed as text; any other JSON value (numbers, `null`,
/// objects) reads as empty text but serializes back unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawText {
    #[default]
    Absent,
    Text(String),
    Other(Value),
}

impl RawText {
    pub fn as_str(&self) -> &str {
        match self {
            RawText::Text(s) => s,
            _ => "",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, RawText::Absent)
    }

    /// No usable value: absent, `null` or blank text
    pub fn is_missing(&self) -> bool {
        match self {
            RawText::Absent | RawText::Other(Value::Null) => true,
            RawText::Text(s) => s.trim().is_empty(),
            RawText::Other(_) => false,
        }
    }
}

impl Deref for RawText {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for RawText {
    fn from(s: &str) -> Self {
        RawText::Text(s.to_string())
    }
}

impl PartialEq<str> for RawText {
    fn eq(&self, other: &str) -> bool {
        matches!(self, RawText::Text(s) if s == other)
    }
}

impl PartialEq<&str> for RawText {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for RawText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawText::Absent => Ok(()),
            RawText::Text(s) => f.write_str(s),
            RawText::Other(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for RawText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawText::Absent => serializer.serialize_none(),
            RawText::Text(s) => serializer.serialize_str(s),
            RawText::Other(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for RawText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => RawText::Text(s),
            other => RawText::Other(other),
        })
    }
}

/// Single hourly reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Day of the reading, `YYYY/MM/DD`
    #[serde(default, skip_serializing_if = "RawText::is_absent")]
    pub date: RawText,

    /// End of the hour, `HH:MM` (may be `24:00`)
    #[serde(default, skip_serializing_if = "RawText::is_absent")]
    pub time: RawText,

    /// Energy imported from the grid
    #[serde(rename = "consumptionKWh", default, deserialize_with = "lenient_kwh")]
    pub consumption_kwh: f64,

    /// Energy exported to the grid
    #[serde(rename = "surplusEnergyKWh", default, deserialize_with = "lenient_kwh")]
    pub surplus_energy_kwh: f64,

    /// Tariff period, filled in by enrichment when absent
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_period"
    )]
    pub period: Option<Period>,

    /// Provider fields this crate does not interpret (cups, obtainMethod, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Set by enrichment for structurally invalid readings
    #[serde(skip)]
    pub flag: Option<ReadingFlag>,
}

impl Reading {
    pub fn new(date: &str, time: &str, consumption_kwh: f64, surplus_energy_kwh: f64) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            consumption_kwh,
            surplus_energy_kwh,
            ..Self::default()
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = Some(period);
        self
    }

    /// Whether the reading contributes to numeric totals
    pub fn is_valid(&self) -> bool {
        self.flag.is_none()
    }
}

/// Decode a provider payload into readings without ever failing.
///
/// Non-array payloads yield an empty batch; array elements that are not
/// objects become empty readings that keep the raw element under `raw`.
pub fn decode_readings(payload: &Value) -> Vec<Reading> {
    let Some(items) = payload.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match serde_json::from_value::<Reading>(item.clone()) {
            Ok(r) => r,
            Err(_) => {
                let mut extra = Map::new();
                extra.insert("raw".to_string(), item.clone());
                Reading {
                    extra,
                    ..Reading::default()
                }
            }
        })
        .collect()
}

/// Coerce a JSON value to a finite number; anything else becomes zero
pub fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

fn lenient_kwh<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0.0, coerce_number))
}

fn lenient_period<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Period>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value::<Period>(v).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_provider_shape() {
        let r: Reading = serde_json::from_value(json!({
            "cups": "ES0031405000000000AA0F",
            "date": "2024/03/13",
            "time": "01:00",
            "consumptionKWh": 0.245,
            "obtainMethod": "Real",
            "surplusEnergyKWh": 0
        }))
        .unwrap();
        assert_eq!(r.date, "2024/03/13");
        assert!((r.consumption_kwh - 0.245).abs() < 1e-12);
        assert_eq!(r.period, None);
        assert_eq!(r.extra.get("obtainMethod"), Some(&json!("Real")));
    }

    #[test]
    fn test_lenient_numbers() {
        let r: Reading = serde_json::from_value(json!({
            "date": "2024/03/13",
            "time": "01:00",
            "consumptionKWh": "1,5",
            "surplusEnergyKWh": "n/a"
        }))
        .unwrap();
        assert!((r.consumption_kwh - 1.5).abs() < 1e-12);
        assert_eq!(r.surplus_energy_kwh, 0.0);

        let r: Reading = serde_json::from_value(json!({"consumptionKWh": null})).unwrap();
        assert_eq!(r.consumption_kwh, 0.0);
        assert!(r.date.is_empty());
        assert!(r.date.is_missing());
        // Absent coordinates are not invented on the way out
        let out = serde_json::to_value(&r).unwrap();
        assert!(out.get("date").is_none());
    }

    #[test]
    fn test_raw_text_keeps_non_strings() {
        let r: Reading = serde_json::from_value(json!({"date": 20240313, "time": "12:00"})).unwrap();
        assert_eq!(r.date, RawText::Other(json!(20240313)));
        assert!(r.date.is_empty());
        assert!(!r.date.is_missing());
        assert_eq!(r.date.to_string(), "20240313");
        assert_eq!(serde_json::to_value(&r).unwrap()["date"], json!(20240313));
    }

    #[test]
    fn test_unknown_period_is_dropped_for_recompute() {
        let r: Reading = serde_json::from_value(json!({"period": "P9"})).unwrap();
        assert_eq!(r.period, None);
        let r: Reading = serde_json::from_value(json!({"period": "P2"})).unwrap();
        assert_eq!(r.period, Some(Period::P2));
    }

    #[test]
    fn test_extra_fields_survive_serialization() {
        let r: Reading = serde_json::from_value(json!({
            "date": "2024/03/13", "time": "01:00", "cups": "X"
        }))
        .unwrap();
        let out = serde_json::to_value(r.with_period(Period::P3)).unwrap();
        assert_eq!(out["cups"], json!("X"));
        assert_eq!(out["period"], json!("P3"));
    }

    #[test]
    fn test_decode_readings_keeps_garbage_elements() {
        let batch = decode_readings(&json!([
            {"date": "2024/03/13", "time": "01:00", "consumptionKWh": 1.0},
            42,
            "garbage"
        ]));
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[1].extra.get("raw"), Some(&json!(42)));
        assert!(decode_readings(&json!({"not": "an array"})).is_empty());
    }
}
