//! Savings engine: per-household evaluation and the population driver.
//!
//! Wires the rate provider, the two classifiers, the aggregator, and the
//! reconciler into one pure transformation from [`HouseholdPeriod`] records
//! to [`HouseholdOutcome`] records. Households are independent of each
//! other; the only cross-row state is the [`ClassificationCensus`].

use std::collections::BTreeMap;

use saverate_core::config::{EngineConfig, FlowDeflation};
use saverate_core::error::{ClassificationError, ConfigError, RateError, SaverateError};
use saverate_core::outcome::{AssetOutcome, HouseholdOutcome, StateTag};
use saverate_core::traits::{AssetDecomposer, RateProvider};
use saverate_core::types::{AssetClass, AssetObservation, HouseholdPeriod, Period, PeriodContext, RateKind};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::aggregate_household;
use crate::classify::FlowAwareDecomposer;
use crate::fixed::FixedReturnDecomposer;
use crate::reconcile::reconcile_net_worth;

/// Per-class count of rows in each classification state.
///
/// Every row lands in exactly one state per class, so each class's total
/// must equal the number of rows recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationCensus {
    rows: usize,
    counts: BTreeMap<AssetClass, BTreeMap<StateTag, usize>>,
    implausible_rates: usize,
}

impl ClassificationCensus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one household's states.
    pub fn record_household(&mut self, outcome: &HouseholdOutcome) {
        self.rows += 1;
        for asset in &outcome.assets {
            *self
                .counts
                .entry(asset.class)
                .or_default()
                .entry(asset.state.tag())
                .or_default() += 1;
            if asset.is_rate_implausible() {
                self.implausible_rates += 1;
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows whose implied rate was too extreme to book as capital gains.
    pub fn implausible_rates(&self) -> usize {
        self.implausible_rates
    }

    pub fn count(&self, class: AssetClass, tag: StateTag) -> usize {
        self.counts
            .get(&class)
            .and_then(|by_state| by_state.get(&tag))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_for(&self, class: AssetClass) -> usize {
        self.counts
            .get(&class)
            .map(|by_state| by_state.values().sum())
            .unwrap_or(0)
    }

    /// Check that every class accounts for every row exactly once.
    pub fn verify(&self) -> Result<(), ClassificationError> {
        for class in AssetClass::ALL {
            let counted = self.total_for(class);
            if counted != self.rows {
                return Err(ClassificationError::CensusMismatch {
                    class,
                    counted,
                    expected: self.rows,
                });
            }
        }
        Ok(())
    }
}

/// Outcomes for a whole population, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationOutcome {
    pub households: Vec<HouseholdOutcome>,
    pub census: ClassificationCensus,
}

/// The savings decomposition engine.
///
/// Generic over the [`RateProvider`] so tables loaded at startup and
/// constant-rate providers share one code path.
#[derive(Debug, Clone)]
pub struct SavingsEngine<R> {
    config: EngineConfig,
    rates: R,
}

impl<R: RateProvider> SavingsEngine<R> {
    /// Create an engine after validating `config`.
    pub fn new(config: EngineConfig, rates: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, rates })
    }

    /// Create an engine with [`EngineConfig::default`].
    pub fn with_defaults(rates: R) -> Self {
        Self {
            config: EngineConfig::default(),
            rates,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rates(&self) -> &R {
        &self.rates
    }

    /// Inflation factors and duration for one household-period.
    pub fn period_context(&self, household: &HouseholdPeriod) -> Result<PeriodContext, RateError> {
        let period = &household.period;
        let target = period.target_year;
        let flow_year = match self.config.flow_deflation {
            FlowDeflation::Midpoint => period.midpoint_year(),
            FlowDeflation::EndYear => period.end_year,
        };
        Ok(PeriodContext {
            household_id: household.household_id,
            duration: period.duration_years(),
            inflation_start: self.rates.inflation_factor(period.start_year, target)?,
            inflation_end: self.rates.inflation_factor(period.end_year, target)?,
            inflation_flow: self.rates.inflation_factor(flow_year, target)?,
        })
    }

    /// The decomposer for `class` over `period`, with its assumed or
    /// default rate resolved from the rate provider.
    pub fn decomposer_for(&self, class: AssetClass, period: &Period) -> Result<Box<dyn AssetDecomposer>, RateError> {
        let (start, end) = (period.start_year, period.end_year);
        if let Some(assumption) = self.config.fixed_return.assumption_for(class) {
            let inflation = self.rates.annualized_rate(RateKind::Inflation, start, end)?;
            return Ok(Box::new(FixedReturnDecomposer::new(assumption.nominal_rate(inflation))));
        }
        let mut decomposer = FlowAwareDecomposer::new(self.config.implausible_rate_threshold);
        if let Some(kind) = self.config.flow_aware.kind_for(class) {
            let rate = self.rates.annualized_rate(kind, start, end)?;
            decomposer = decomposer.with_default_rate(kind, rate);
        }
        Ok(Box::new(decomposer))
    }

    /// Classify and decompose one asset observation.
    pub fn decompose_asset(
        &self,
        period: &Period,
        obs: &AssetObservation,
        ctx: &PeriodContext,
    ) -> Result<AssetOutcome, SaverateError> {
        let decomposer = self.decomposer_for(obs.class, period)?;
        Ok(decomposer.decompose(obs, ctx)?)
    }

    /// Validate, classify every asset class, aggregate, and reconcile one
    /// household-period. Classes absent from the input are evaluated as
    /// fully unknown observations.
    pub fn evaluate_household(&self, household: &HouseholdPeriod) -> Result<HouseholdOutcome, SaverateError> {
        household.validate()?;
        let ctx = self.period_context(household)?;
        let policy = self.config.missing_asset_policy;

        let assets = AssetClass::ALL
            .into_iter()
            .map(|class| self.decompose_asset(&household.period, &household.observation(class), &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        let totals = aggregate_household(household, &assets, &ctx, policy);
        let net_worth = reconcile_net_worth(household, &assets, &totals, &ctx, policy);
        debug!(
            household_id = household.household_id,
            net_active_savings = ?totals.net_active_savings,
            unknown_savings = totals.unknown_savings_assets,
            "engine: household evaluated"
        );

        Ok(HouseholdOutcome {
            household_id: household.household_id,
            period: household.period,
            weight: household.weight,
            assets,
            totals,
            net_worth,
        })
    }

    /// Evaluate every household and verify the classification census.
    /// Stops at the first error.
    pub fn evaluate_population(&self, households: &[HouseholdPeriod]) -> Result<PopulationOutcome, SaverateError> {
        let mut census = ClassificationCensus::new();
        let mut outcomes = Vec::with_capacity(households.len());
        for household in households {
            let outcome = self.evaluate_household(household)?;
            census.record_household(&outcome);
            outcomes.push(outcome);
        }
        census.verify()?;

        if census.implausible_rates() > 0 {
            warn!(
                count = census.implausible_rates(),
                threshold = self.config.implausible_rate_threshold,
                "engine: implied rates above plausibility threshold, savings and capital gains left unknown"
            );
        }
        info!(
            households = census.rows(),
            implausible = census.implausible_rates(),
            "engine: population evaluated"
        );

        Ok(PopulationOutcome {
            households: outcomes,
            census,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{FlatRates, IndexSeries, RateTable};
    use saverate_core::config::{MissingAssetPolicy, ReturnAssumption};
    use saverate_core::error::InputError;
    use saverate_core::outcome::ClassificationState;

    fn period() -> Period {
        Period::new(2001, 2003, 2019).unwrap()
    }

    fn engine() -> SavingsEngine<FlatRates> {
        SavingsEngine::with_defaults(FlatRates::default())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "actual={actual}, expected={expected}"
        );
    }

    // --- construction ---

    #[test]
    fn invalid_config_rejected() {
        let config = EngineConfig {
            implausible_rate_threshold: -0.1,
            ..EngineConfig::default()
        };
        assert!(SavingsEngine::new(config, FlatRates::default()).is_err());
    }

    #[test]
    fn period_context_uses_midpoint_by_default() {
        let rates = FlatRates::default().with(RateKind::Inflation, 0.10);
        let h = HouseholdPeriod::new(1, Period::new(2015, 2019, 2019).unwrap());
        let ctx = SavingsEngine::with_defaults(rates).period_context(&h).unwrap();
        assert_eq!(ctx.duration, 4.0);
        assert_close(ctx.inflation_start, 1.4641);
        assert_close(ctx.inflation_end, 1.0);
        assert_close(ctx.inflation_flow, 1.21);
    }

    #[test]
    fn period_context_end_year_flows() {
        let rates = FlatRates::default().with(RateKind::Inflation, 0.10);
        let config = EngineConfig {
            flow_deflation: FlowDeflation::EndYear,
            ..EngineConfig::default()
        };
        let h = HouseholdPeriod::new(1, Period::new(2015, 2019, 2020).unwrap());
        let ctx = SavingsEngine::new(config, rates).unwrap().period_context(&h).unwrap();
        assert_close(ctx.inflation_flow, 1.1);
        assert_close(ctx.inflation_end, 1.1);
    }

    #[test]
    fn missing_series_is_fatal() {
        let cpi = IndexSeries::from_levels(RateKind::Inflation, [(2001, 1.0), (2019, 1.5)]).unwrap();
        let engine = SavingsEngine::with_defaults(RateTable::new().with_series(cpi));
        let h = HouseholdPeriod::new(1, period());
        assert!(matches!(
            engine.evaluate_household(&h),
            Err(SaverateError::Rate(RateError::SeriesNotLoaded { kind: RateKind::Stock }))
        ));
    }

    // --- decomposer selection ---

    #[test]
    fn fixed_return_rate_tracks_inflation() {
        let rates = FlatRates::default().with(RateKind::Inflation, 0.03);
        let engine = SavingsEngine::with_defaults(rates);
        let obs = AssetObservation::unobserved(AssetClass::OtherAssets).balances(Some(1_000.0), Some(1_000.0));
        let ctx = PeriodContext::nominal(1, 2.0);
        let out = engine.decompose_asset(&period(), &obs, &ctx).unwrap();
        let ClassificationState::AssumedReturn { annual_rate, .. } = out.state else {
            panic!("expected assumed return, got {:?}", out.state);
        };
        assert_close(annual_rate, 1.01 * 1.03 - 1.0);
    }

    #[test]
    fn nominal_assumption_ignores_inflation() {
        let rates = FlatRates::default().with(RateKind::Inflation, 0.03);
        let mut config = EngineConfig::default();
        config.fixed_return.vehicles = ReturnAssumption::Nominal(-0.15);
        let engine = SavingsEngine::new(config, rates).unwrap();
        let obs = AssetObservation::unobserved(AssetClass::Vehicles).balances(Some(10_000.0), None);
        let out = engine
            .decompose_asset(&period(), &obs, &PeriodContext::nominal(1, 2.0))
            .unwrap();
        assert_close(out.balance_end.unwrap(), 10_000.0 * 0.85 * 0.85);
    }

    #[test]
    fn brokerage_gets_stock_default_rate() {
        let rates = FlatRates::default().with(RateKind::Stock, 0.07);
        let engine = SavingsEngine::with_defaults(rates);
        let obs = AssetObservation::unobserved(AssetClass::BrokerageStocks)
            .balances(Some(1_000.0), None)
            .flows(Some(100.0), None);
        let out = engine
            .decompose_asset(&period(), &obs, &PeriodContext::nominal(1, 2.0))
            .unwrap();
        assert_eq!(out.state.tag(), StateTag::FlowAtDefaultRate);
    }

    #[test]
    fn home_has_no_default_rate() {
        let obs = AssetObservation::unobserved(AssetClass::Home)
            .balances(Some(1_000.0), None)
            .flows(Some(100.0), None);
        let out = engine()
            .decompose_asset(&period(), &obs, &PeriodContext::nominal(1, 2.0))
            .unwrap();
        assert_eq!(out.state.tag(), StateTag::FlowWithoutAnchor);
    }

    // --- households ---

    #[test]
    fn every_class_evaluated_in_order() {
        let out = engine().evaluate_household(&HouseholdPeriod::new(9, period())).unwrap();
        let classes: Vec<_> = out.assets.iter().map(|a| a.class).collect();
        assert_eq!(classes, AssetClass::ALL.to_vec());
        assert_eq!(out.totals.total_gross_savings, Some(0.0));
        assert_eq!(out.totals.unknown_savings_assets, AssetClass::ALL.len());
    }

    #[test]
    fn propagate_policy_reaches_totals() {
        let config = EngineConfig {
            missing_asset_policy: MissingAssetPolicy::Propagate,
            ..EngineConfig::default()
        };
        let engine = SavingsEngine::new(config, FlatRates::default()).unwrap();
        let out = engine.evaluate_household(&HouseholdPeriod::new(9, period())).unwrap();
        assert_eq!(out.totals.total_gross_savings, None);
        assert_eq!(out.net_worth.with_home_and_retirement.start, None);
    }

    #[test]
    fn invalid_input_rejected() {
        let h = HouseholdPeriod::new(4, period()).with_asset(
            AssetObservation::unobserved(AssetClass::Vehicles).balances(Some(-5.0), None),
        );
        assert!(matches!(
            engine().evaluate_household(&h),
            Err(SaverateError::Input(InputError::NegativeBalance { .. }))
        ));
    }

    // --- population ---

    #[test]
    fn census_counts_every_row() {
        let households = vec![
            HouseholdPeriod::new(1, period()),
            HouseholdPeriod::new(2, period()).with_asset(
                AssetObservation::unobserved(AssetClass::Home).balances(Some(100.0), Some(500.0)),
            ),
        ];
        let pop = engine().evaluate_population(&households).unwrap();
        assert_eq!(pop.households.len(), 2);
        assert_eq!(pop.census.rows(), 2);
        assert_eq!(pop.census.implausible_rates(), 1);
        assert_eq!(pop.census.count(AssetClass::Home, StateTag::NoFlowTwoBalances), 1);
        assert_eq!(pop.census.count(AssetClass::Home, StateTag::NoFlowNoBalance), 1);
        for class in AssetClass::ALL {
            assert_eq!(pop.census.total_for(class), 2);
        }
    }

    #[test]
    fn census_mismatch_detected() {
        let mut census = ClassificationCensus::new();
        let out = engine().evaluate_household(&HouseholdPeriod::new(1, period())).unwrap();
        census.record_household(&out);
        assert!(census.verify().is_ok());
        census.rows += 1;
        assert_eq!(
            census.verify(),
            Err(ClassificationError::CensusMismatch {
                class: AssetClass::Home,
                counted: 1,
                expected: 2,
            })
        );
    }

    #[test]
    fn first_error_stops_population() {
        let bad = HouseholdPeriod {
            period: Period {
                start_year: 2005,
                end_year: 2003,
                target_year: 2019,
            },
            ..HouseholdPeriod::new(2, period())
        };
        let households = vec![HouseholdPeriod::new(1, period()), bad];
        assert!(matches!(
            engine().evaluate_population(&households),
            Err(SaverateError::Input(InputError::InvalidPeriod { start: 2005, end: 2003 }))
        ));
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SavingsEngine<RateTable>>();
        assert_send_sync::<SavingsEngine<FlatRates>>();
    }
}
