use serde_json::json;
use tarifa::aggregate::{ConsumptionAggregator, MonthKey, WINDOW_MONTHS};
use tarifa::reading::{Reading, decode_readings};
use tarifa::Period;

fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).unwrap()
}

/// One weekday noon reading of 1 kWh on the 15th of each month
fn monthly_readings(first: MonthKey, months: i32) -> Vec<Reading> {
    (0..months)
        .map(|i| {
            let key = first.add_months(i);
            Reading::new(&format!("{}/15", key), "12:00", 1.0, 0.5)
        })
        .collect()
}

#[test]
fn window_is_twelve_consecutive_months_from_earliest() {
    let agg = ConsumptionAggregator::new();
    let readings = agg.enrich(monthly_readings(month(2023, 11), 5));
    let summary = agg.build_monthly_summary(&readings);
    let window = agg.rolling_window(&summary, month(2024, 3));

    assert_eq!(window.len(), WINDOW_MONTHS);
    assert_eq!(window.start(), Some(month(2023, 11)));
    assert_eq!(window.end(), Some(month(2024, 10)));
    let keys: Vec<MonthKey> = window.iter().map(|b| b.month_key).collect();
    for pair in keys.windows(2) {
        assert_eq!(pair[0].succ(), pair[1]);
    }
    // Gaps are zero-filled with calendar metadata
    let last = &window.buckets()[11];
    assert_eq!(last.consumption_total(), 0.0);
    assert_eq!(last.days_in_month, 31);
    assert_eq!(last.display_label, "Oct-24");
    assert_eq!(window.buckets()[3].days_in_month, 29);
}

#[test]
fn empty_summary_anchors_on_current_month() {
    let agg = ConsumptionAggregator::new();
    let window = agg.rolling_window(&Default::default(), month(2024, 12));
    assert_eq!(window.start(), Some(month(2024, 12)));
    assert_eq!(window.end(), Some(month(2025, 11)));
    assert_eq!(window.total(), 0.0);
}

#[test]
fn summary_reconciles_when_data_fits_the_window() {
    let agg = ConsumptionAggregator::new();
    let summary = agg.summarize(monthly_readings(month(2023, 6), 12), month(2024, 5));
    assert!(summary.reconciled);
    assert!((summary.totals.total - 12.0).abs() < 1e-9);
    let by_period: f64 = Period::ALL
        .iter()
        .map(|p| summary.window.period_total(*p))
        .sum();
    assert!((by_period - 12.0).abs() < 1e-9);
    assert!((summary.window.surplus_total() - 6.0).abs() < 1e-9);
    assert_eq!(summary.flagged, 0);
}

#[test]
fn summary_flags_data_outside_the_window() {
    let agg = ConsumptionAggregator::new();
    let summary = agg.summarize(monthly_readings(month(2023, 1), 14), month(2024, 2));
    assert!(!summary.reconciled);
    assert!((summary.totals.total - 14.0).abs() < 1e-9);
    assert!((summary.window.total() - 12.0).abs() < 1e-9);
}

#[test]
fn invalid_readings_are_kept_but_not_counted() {
    let payload = json!([
        {"cups": "ES001", "date": "2024/03/13", "time": "12:00", "consumptionKWh": "1.5", "obtainMethod": "Real"},
        {"cups": "ES001", "date": "2024/03/13", "time": "24:00", "consumptionKWh": 2.0},
        {"cups": "ES001", "date": "", "time": "12:00", "consumptionKWh": 9.0},
        {"cups": "ES001", "date": "13/03/2024", "time": "12:00", "consumptionKWh": 9.0},
        {"cups": "ES001", "date": "2024/03/13", "time": "noon", "consumptionKWh": 9.0},
        {"cups": "ES001", "date": "2024/03/16", "time": "10:00", "consumptionKWh": null}
    ]);
    let agg = ConsumptionAggregator::new();
    let readings = agg.enrich(decode_readings(&payload));
    assert_eq!(readings.len(), 6);
    assert_eq!(readings.iter().filter(|r| !r.is_valid()).count(), 3);
    assert_eq!(readings[0].period, Some(Period::P1));
    assert_eq!(readings[1].period, Some(Period::P2));
    assert_eq!(readings[5].period, Some(Period::P3));
    assert_eq!(readings[0].extra["obtainMethod"], "Real");

    let totals = agg.totals(&readings);
    assert!((totals.total - 3.5).abs() < 1e-9);
    assert!((totals.by_period.get(Period::P1) - 1.5).abs() < 1e-9);
    assert!((totals.by_period.get(Period::P2) - 2.0).abs() < 1e-9);

    let summary = agg.build_monthly_summary(&readings);
    assert_eq!(summary.len(), 1);
    let bucket = &summary[&month(2024, 3)];
    assert!((bucket.consumption_total() - totals.total).abs() < 1e-9);
}

#[test]
fn provided_period_is_kept() {
    let agg = ConsumptionAggregator::new();
    let readings = agg.enrich(vec![
        Reading::new("2024/03/13", "12:00", 1.0, 0.0).with_period(Period::P3),
    ]);
    assert_eq!(readings[0].period, Some(Period::P3));
    let summary = agg.build_monthly_summary(&readings);
    assert_eq!(summary[&month(2024, 3)].p3, 1.0);
}

#[test]
fn summary_serializes_window_as_array() {
    let agg = ConsumptionAggregator::new();
    let summary = agg.summarize(monthly_readings(month(2024, 1), 2), month(2024, 2));
    let v = serde_json::to_value(&summary).unwrap();
    assert_eq!(v["window"].as_array().unwrap().len(), 12);
    assert_eq!(v["window"][0]["monthKey"], "2024/01");
    assert_eq!(v["window"][0]["P1"], 1.0);
    assert_eq!(v["totals"]["byPeriod"]["P1"], 2.0);
    assert!(v.get("readings").is_none());
}

#[test]
fn non_text_coordinates_survive_enrichment_unchanged() {
    let payload = json!([
        {"date": 20240313, "time": "12:00", "consumptionKWh": 1.0},
        {"date": "2024/03/13", "time": null, "consumptionKWh": 1.0}
    ]);
    let agg = ConsumptionAggregator::new();
    let readings = agg.enrich(decode_readings(&payload));
    assert!(readings.iter().all(|r| !r.is_valid()));
    assert_eq!(agg.totals(&readings).total, 0.0);

    let out = serde_json::to_value(&readings).unwrap();
    assert_eq!(out[0]["date"], json!(20240313));
    assert_eq!(out[1]["time"], json!(null));

    // Same through a text round-trip, as the cache stores it
    let text = serde_json::to_string(&readings).unwrap();
    let back: Vec<Reading> = serde_json::from_str(&text).unwrap();
    assert_eq!(back[0].date, readings[0].date);
    assert_eq!(serde_json::to_value(&back).unwrap(), out);
}
