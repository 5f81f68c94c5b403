//! Shared fixtures for scenario and property tests.

use saverate_core::constants::IDENTITY_TOLERANCE;
use saverate_core::types::{
    AssetClass, AssetObservation, HomeEquityRecord, HouseholdPeriod, Period, RateKind,
};
use saverate_engine::{FlatRates, IndexSeries, RateTable, SavingsEngine};

/// Target year all real amounts are expressed in.
pub const TARGET_YEAR: i32 = 2019;

/// Install a test-writer subscriber filtered by `RUST_LOG`. Safe to call
/// from every test; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}

pub fn period(start_year: i32, end_year: i32) -> Period {
    Period::new(start_year, end_year, TARGET_YEAR).unwrap()
}

/// An engine with default config and zero rates everywhere, so real and
/// nominal amounts coincide.
pub fn nominal_engine() -> SavingsEngine<FlatRates> {
    SavingsEngine::with_defaults(FlatRates::default())
}

/// Index tables covering 1999..=2019: 2.5% inflation, 7% stocks, 3% bonds,
/// and 5% for the blended retirement proxy.
pub fn rate_table() -> RateTable {
    let series = |kind, rate: f64| IndexSeries::from_annual_rates(kind, 1999, &[rate; 20]).unwrap();
    RateTable::new()
        .with_series(series(RateKind::Inflation, 0.025))
        .with_series(series(RateKind::Stock, 0.07))
        .with_series(series(RateKind::Bond, 0.03))
        .with_series(series(RateKind::Blended, 0.05))
}

pub fn table_engine() -> SavingsEngine<RateTable> {
    SavingsEngine::with_defaults(rate_table())
}

/// Household A: a home that was not sold, with 15,000 of renovations and
/// 45 of mortgage principal paid, and a 34,220 rise in value.
pub fn household_a() -> HouseholdPeriod {
    let home = HomeEquityRecord {
        owns_start: Some(true),
        owns_end: Some(true),
        value_start: Some(100_000.0),
        value_end: Some(134_220.0),
        mortgage_start: Some(50_000.0),
        mortgage_end: Some(49_955.0),
        improvements: Some(15_000.0),
        moved: false,
    };
    HouseholdPeriod::new(1, period(2001, 2006)).with_asset(home.into_observation())
}

/// Household B: business equity whose change is fully explained by flows.
pub fn household_b() -> HouseholdPeriod {
    HouseholdPeriod::new(2, period(2001, 2003)).with_asset(
        AssetObservation::unobserved(AssetClass::Business)
            .ownership(Some(true), Some(true))
            .balances(Some(11_000.0), Some(32_755.0))
            .flows(Some(22_000.0), Some(245.0)),
    )
}

/// A household whose only activity is in checking and savings.
pub fn household_checking() -> HouseholdPeriod {
    HouseholdPeriod::new(3, period(2001, 2003)).with_asset(
        AssetObservation::unobserved(AssetClass::CheckingAndSavings)
            .balances(Some(25_000.0), Some(34_000.0)),
    )
}

/// Relative comparison at the engine's identity tolerance.
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= IDENTITY_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(approx_eq(actual, expected), "actual={actual}, expected={expected}");
}
