#![no_main]
use libfuzzer_sys::fuzz_target;
use tarifa::ConsumptionAggregator;
use tarifa::tariff::ClockTime;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary text as a clock time must parse or fail cleanly
    let _ = text.parse::<ClockTime>();

    // Arbitrary JSON as a provider payload: every element survives enrichment
    let Ok(payload) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };
    let readings = tarifa::reading::decode_readings(&payload);
    let expected = readings.len();
    let aggregator = ConsumptionAggregator::new();
    let enriched = aggregator.enrich(readings);
    assert_eq!(enriched.len(), expected);

    let summary = aggregator.build_monthly_summary(&enriched);
    let _ = aggregator.totals(&enriched);
    let valid = enriched.iter().filter(|r| r.is_valid()).count();
    assert!(summary.len() <= valid);
});
