//! Criterion benchmarks for saverate-engine hot paths.
//!
//! Covers: single-asset classification, one full household, and a
//! population run with the census check.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use saverate_core::traits::AssetDecomposer;
use saverate_core::types::{AssetClass, AssetObservation, HouseholdPeriod, Period, PeriodContext, RateKind};
use saverate_engine::{FlatRates, FlowAwareDecomposer, SavingsEngine};

fn rates() -> FlatRates {
    FlatRates::default()
        .with(RateKind::Inflation, 0.025)
        .with(RateKind::Stock, 0.07)
        .with(RateKind::Blended, 0.05)
}

/// A household with a mix of states across its asset classes. `seed` varies
/// the balances so rows do not all take the same branch.
fn household(seed: u64) -> HouseholdPeriod {
    let period = Period::new(2001, 2003, 2019).unwrap();
    let scale = 1_000.0 + (seed % 97) as f64 * 250.0;
    let obs = AssetObservation::unobserved;
    HouseholdPeriod::new(seed, period)
        .with_income(Some(40_000.0 + scale), Some(32_000.0 + scale))
        .with_asset(obs(AssetClass::Home).balances(Some(50.0 * scale), Some(55.0 * scale)).flows(Some(scale), None))
        .with_asset(obs(AssetClass::Business).balances(Some(10.0 * scale), Some(40.0 * scale)))
        .with_asset(obs(AssetClass::BrokerageStocks).balances(Some(5.0 * scale), None).flows(Some(scale), None))
        .with_asset(obs(AssetClass::CheckingAndSavings).balances(Some(2.0 * scale), Some(3.0 * scale)))
        .with_asset(obs(AssetClass::OtherDebts).balances(Some(4.0 * scale), Some(3.0 * scale)))
        .with_asset(
            obs(AssetClass::PrivateRetirement)
                .ownership(Some(false), Some(true))
                .balances(None, Some(8.0 * scale)),
        )
        .with_asset(obs(AssetClass::EmployerRetirement).flows(Some(scale), Some(0.0)))
}

fn bench_classify_asset(c: &mut Criterion) {
    let decomposer = FlowAwareDecomposer::new(0.20).with_default_rate(RateKind::Stock, 0.07);
    let obs = AssetObservation::unobserved(AssetClass::BrokerageStocks)
        .balances(Some(10_000.0), None)
        .flows(Some(2_000.0), Some(500.0));
    let ctx = PeriodContext::nominal(1, 2.0);

    c.bench_function("classify_flow_aware_asset", |b| {
        b.iter(|| decomposer.decompose(black_box(&obs), black_box(&ctx)))
    });
}

fn bench_evaluate_household(c: &mut Criterion) {
    let engine = SavingsEngine::with_defaults(rates());
    let h = household(42);

    c.bench_function("evaluate_household", |b| {
        b.iter(|| engine.evaluate_household(black_box(&h)))
    });
}

fn bench_evaluate_population(c: &mut Criterion) {
    let engine = SavingsEngine::with_defaults(rates());
    let population: Vec<HouseholdPeriod> = (0..1_000).map(household).collect();

    c.bench_function("evaluate_population_1000", |b| {
        b.iter(|| engine.evaluate_population(black_box(&population)))
    });
}

criterion_group!(
    benches,
    bench_classify_asset,
    bench_evaluate_household,
    bench_evaluate_population,
);
criterion_main!(benches);
