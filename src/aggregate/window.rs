use super::month::MonthKey;
use crate::tariff::Period;
use serde::{Deserialize, Serialize};

/// Number of months in a rolling window
pub const WINDOW_MONTHS: usize = 12;

/// Per-period consumption plus surplus for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    pub month_key: MonthKey,
    #[serde(rename = "P1")]
    pub p1: f64,
    #[serde(rename = "P2")]
    pub p2: f64,
    #[serde(rename = "P3")]
    pub p3: f64,
    #[serde(rename = "surplusEnergyKWh")]
    pub surplus_energy_kwh: f64,
    pub days_in_month: u32,
    pub display_label: String,
}

impl MonthlyBucket {
    /// Zero-valued bucket with calendar metadata filled in
    pub fn empty(month_key: MonthKey) -> Self {
        Self {
            month_key,
            p1: 0.0,
            p2: 0.0,
            p3: 0.0,
            surplus_energy_kwh: 0.0,
            days_in_month: month_key.days_in_month(),
            display_label: month_key.label(),
        }
    }

    pub fn add(&mut self, period: Period, consumption_kwh: f64, surplus_energy_kwh: f64) {
        match period {
            Period::P1 => self.p1 += consumption_kwh,
            Period::P2 => self.p2 += consumption_kwh,
            Period::P3 => self.p3 += consumption_kwh,
        }
        self.surplus_energy_kwh += surplus_energy_kwh;
    }

    pub fn get(&self, period: Period) -> f64 {
        match period {
            Period::P1 => self.p1,
            Period::P2 => self.p2,
            Period::P3 => self.p3,
        }
    }

    /// P1 + P2 + P3
    pub fn consumption_total(&self) -> f64 {
        self.p1 + self.p2 + self.p3
    }
}

/// Exactly twelve consecutive monthly buckets in chronological order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RollingWindow {
    buckets: Vec<MonthlyBucket>,
}

impl RollingWindow {
    /// Build from an anchor month, pulling each bucket from `lookup` or
    /// zero-filling the gap
    pub(crate) fn build<F>(start: MonthKey, mut lookup: F) -> Self
    where
        F: FnMut(MonthKey) -> Option<MonthlyBucket>,
    {
        let mut buckets = Vec::with_capacity(WINDOW_MONTHS);
        let mut key = start;
        for _ in 0..WINDOW_MONTHS {
            let mut bucket = lookup(key).unwrap_or_else(|| MonthlyBucket::empty(key));
            bucket.month_key = key;
            bucket.days_in_month = key.days_in_month();
            bucket.display_label = key.label();
            buckets.push(bucket);
            key = key.succ();
        }
        Self { buckets }
    }

    pub fn buckets(&self) -> &[MonthlyBucket] {
        &self.buckets
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MonthlyBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn start(&self) -> Option<MonthKey> {
        self.buckets.first().map(|b| b.month_key)
    }

    pub fn end(&self) -> Option<MonthKey> {
        self.buckets.last().map(|b| b.month_key)
    }

    pub fn contains(&self, key: MonthKey) -> bool {
        self.buckets.iter().any(|b| b.month_key == key)
    }

    /// Consumption across every bucket and period
    pub fn total(&self) -> f64 {
        self.buckets.iter().map(MonthlyBucket::consumption_total).sum()
    }

    pub fn period_total(&self, period: Period) -> f64 {
        self.buckets.iter().map(|b| b.get(period)).sum()
    }

    pub fn surplus_total(&self) -> f64 {
        self.buckets.iter().map(|b| b.surplus_energy_kwh).sum()
    }
}

impl<'a> IntoIterator for &'a RollingWindow {
    type Item = &'a MonthlyBucket;
    type IntoIter = std::slice::Iter<'a, MonthlyBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_zero_fills_and_normalizes_metadata() {
        let start = MonthKey::new(2023, 11).unwrap();
        let feb = MonthKey::new(2024, 2).unwrap();
        let window = RollingWindow::build(start, |key| {
            (key == feb).then(|| {
                let mut b = MonthlyBucket::empty(key);
                b.display_label = "stale".to_string();
                b.add(Period::P1, 2.0, 0.5);
                b
            })
        });
        assert_eq!(window.len(), WINDOW_MONTHS);
        assert_eq!(window.start(), Some(start));
        assert_eq!(window.end(), Some(MonthKey::new(2024, 10).unwrap()));
        let february = &window.buckets()[3];
        assert_eq!(february.month_key, feb);
        assert_eq!(february.days_in_month, 29);
        assert_eq!(february.display_label, "Feb-24");
        assert_eq!(window.total(), 2.0);
        assert_eq!(window.surplus_total(), 0.5);
    }

    #[test]
    fn test_bucket_serializes_period_columns() {
        let mut b = MonthlyBucket::empty(MonthKey::new(2024, 3).unwrap());
        b.add(Period::P2, 1.25, 0.0);
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["monthKey"], "2024/03");
        assert_eq!(v["P2"], 1.25);
        assert_eq!(v["daysInMonth"], 31);
        assert_eq!(v["displayLabel"], "Mar-24");
    }
}
