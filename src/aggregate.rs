//! Consumption aggregation
//!
//! Folds classified readings into per-month period totals and a fixed
//! twelve-month rolling window. Structurally invalid readings are flagged
//! and excluded from every sum but never removed from the stream.

pub mod month;
pub mod window;

pub use month::MonthKey;
pub use window::{MonthlyBucket, RollingWindow, WINDOW_MONTHS};

use crate::logging::get_logger;
use crate::reading::{Reading, ReadingFlag};
use crate::tariff::{self, ClockTime, Period};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

/// Month buckets keyed chronologically
pub type MonthlySummary = BTreeMap<MonthKey, MonthlyBucket>;

const RECONCILE_EPSILON: f64 = 1e-6;

/// Consumption split by tariff period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    #[serde(rename = "P1")]
    pub p1: f64,
    #[serde(rename = "P2")]
    pub p2: f64,
    #[serde(rename = "P3")]
    pub p3: f64,
}

impl PeriodTotals {
    pub fn get(&self, period: Period) -> f64 {
        match period {
            Period::P1 => self.p1,
            Period::P2 => self.p2,
            Period::P3 => self.p3,
        }
    }

    fn add(&mut self, period: Period, kwh: f64) {
        match period {
            Period::P1 => self.p1 += kwh,
            Period::P2 => self.p2 += kwh,
            Period::P3 => self.p3 += kwh,
        }
    }
}

/// Independent cross-check of the monthly summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total: f64,
    pub by_period: PeriodTotals,
}

/// Result of a full aggregation pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionSummary {
    pub window: RollingWindow,
    pub totals: Totals,
    /// Readings excluded for structural problems
    pub flagged: usize,
    /// Window sum equals `totals.total`
    pub reconciled: bool,
    /// Enriched stream, flagged entries included
    #[serde(skip)]
    pub readings: Vec<Reading>,
}

/// Validated coordinates of a reading
struct Classified {
    month: MonthKey,
    period: Period,
}

fn parse_coordinates(reading: &Reading) -> Result<(NaiveDate, ClockTime), ReadingFlag> {
    if reading.date.is_missing() {
        return Err(ReadingFlag::MissingDate);
    }
    let date = tariff::parse_reading_date(&reading.date).map_err(|_| ReadingFlag::InvalidDate)?;
    if reading.time.is_missing() {
        return Err(ReadingFlag::MissingTime);
    }
    let time = reading
        .time
        .parse::<ClockTime>()
        .map_err(|_| ReadingFlag::InvalidTime)?;
    Ok((date, time))
}

/// Month and period for a reading that may count towards totals
fn classify_reading(reading: &Reading) -> Option<Classified> {
    if !reading.is_valid() {
        return None;
    }
    let (date, time) = parse_coordinates(reading).ok()?;
    Some(Classified {
        month: MonthKey::from_date(date),
        period: reading
            .period
            .unwrap_or_else(|| tariff::classify(date, time)),
    })
}

/// Aggregates meter readings into tariff-period summaries
pub struct ConsumptionAggregator {
    logger: crate::logging::StructuredLogger,
}

impl Default for ConsumptionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumptionAggregator {
    pub fn new() -> Self {
        Self {
            logger: get_logger("aggregate"),
        }
    }

    /// Normalize a batch: fill in missing periods, zero out non-finite
    /// numbers and flag readings whose date or time cannot be parsed.
    pub fn enrich(&self, readings: Vec<Reading>) -> Vec<Reading> {
        let mut flagged = 0usize;
        let enriched: Vec<Reading> = readings
            .into_iter()
            .map(|mut r| {
                if !r.consumption_kwh.is_finite() {
                    r.consumption_kwh = 0.0;
                }
                if !r.surplus_energy_kwh.is_finite() {
                    r.surplus_energy_kwh = 0.0;
                }
                match parse_coordinates(&r) {
                    Ok((date, time)) => {
                        r.flag = None;
                        if r.period.is_none() {
                            r.period = Some(tariff::classify(date, time));
                        }
                    }
                    Err(flag) => {
                        flagged += 1;
                        self.logger.debug(&format!(
                            "Excluding reading date='{}' time='{}': {}",
                            r.date,
                            r.time,
                            flag.as_str()
                        ));
                        r.flag = Some(flag);
                    }
                }
                r
            })
            .collect();

        if flagged > 0 {
            self.logger.warn(&format!(
                "{} of {} readings excluded from totals (unparseable date/time)",
                flagged,
                enriched.len()
            ));
        }
        enriched
    }

    /// Group readings by month, accumulating consumption into the bucket
    /// column matching each reading's period
    pub fn build_monthly_summary(&self, readings: &[Reading]) -> MonthlySummary {
        let mut summary = MonthlySummary::new();
        for reading in readings {
            let Some(c) = classify_reading(reading) else {
                continue;
            };
            summary
                .entry(c.month)
                .or_insert_with(|| MonthlyBucket::empty(c.month))
                .add(c.period, reading.consumption_kwh, reading.surplus_energy_kwh);
        }
        summary
    }

    /// Total and per-period consumption, computed independently of buckets
    pub fn totals(&self, readings: &[Reading]) -> Totals {
        let mut totals = Totals::default();
        for reading in readings {
            let Some(c) = classify_reading(reading) else {
                continue;
            };
            totals.total += reading.consumption_kwh;
            totals.by_period.add(c.period, reading.consumption_kwh);
        }
        totals
    }

    /// Twelve consecutive months starting at the earliest month in the
    /// summary, or at `current` when the summary is empty
    pub fn rolling_window(&self, summary: &MonthlySummary, current: MonthKey) -> RollingWindow {
        let start = summary.keys().next().copied().unwrap_or(current);
        RollingWindow::build(start, |key| summary.get(&key).cloned())
    }

    /// Same as [`Self::rolling_window`] with the current month taken from the clock
    pub fn rolling_window_now(&self, summary: &MonthlySummary, tz: Tz) -> RollingWindow {
        self.rolling_window(summary, MonthKey::current_in(tz))
    }

    /// Enrich, bucket, window and reconcile in one pass
    pub fn summarize(&self, readings: Vec<Reading>, current: MonthKey) -> ConsumptionSummary {
        let readings = self.enrich(readings);
        let summary = self.build_monthly_summary(&readings);
        let window = self.rolling_window(&summary, current);
        let totals = self.totals(&readings);
        let flagged = readings.iter().filter(|r| !r.is_valid()).count();

        let drift = (window.total() - totals.total).abs();
        let reconciled = drift <= RECONCILE_EPSILON * totals.total.abs().max(1.0);
        if !reconciled {
            let outside: Vec<String> = summary
                .keys()
                .filter(|k| !window.contains(**k))
                .map(ToString::to_string)
                .collect();
            self.logger.warn(&format!(
                "Window total {:.3} kWh differs from reading total {:.3} kWh; months outside window: {}",
                window.total(),
                totals.total,
                outside.join(", ")
            ));
        }

        ConsumptionSummary {
            window,
            totals,
            flagged,
            reconciled,
            readings,
        }
    }
}
