//! Flow-aware asset classification and the shared state resolution.
//!
//! Each flow-aware observation falls into exactly one of nine states,
//! listed in precedence order in [`StateTag::FLOW_AWARE`]. Every state has
//! its own predicate; a predicate that depends on an earlier state being
//! ruled out says so explicitly. Classification evaluates all nine and
//! rejects an observation that matches none or several, so a broken
//! predicate surfaces as a [`ClassificationError`] instead of a silently
//! double-counted row.
//!
//! Internally balances and flows are signed by net-worth contribution
//! (debts negative) and nominal; resolution converts them into real
//! target-year amounts.

use saverate_core::error::ClassificationError;
use saverate_core::outcome::{AssetOutcome, ClassificationState, KnownBalance, StateTag};
use saverate_core::traits::AssetDecomposer;
use saverate_core::types::{AssetClass, AssetObservation, PeriodContext, RateKind};
use tracing::debug;

use crate::growth::{derive_growth_rates, implied_annual_rate};

/// What is known about one observation, signed by net-worth contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Facts {
    pub has_start: Option<bool>,
    pub has_end: Option<bool>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub net_flow: Option<f64>,
    pub flows_zero_or_absent: bool,
}

impl Facts {
    pub(crate) fn of(obs: &AssetObservation) -> Self {
        let sign = obs.class.orientation();
        Self {
            has_start: obs.has_asset_start,
            has_end: obs.has_asset_end,
            start: obs.effective_start().map(|v| v * sign),
            end: obs.effective_end().map(|v| v * sign),
            net_flow: obs.net_flow().map(|v| v * sign),
            flows_zero_or_absent: obs.flows_zero_or_absent(),
        }
    }

    /// Facts for a class whose flows are never observed.
    pub(crate) fn without_flows(obs: &AssetObservation) -> Self {
        Self {
            net_flow: None,
            flows_zero_or_absent: true,
            ..Self::of(obs)
        }
    }

    pub(crate) fn known_balances(&self) -> usize {
        usize::from(self.start.is_some()) + usize::from(self.end.is_some())
    }

    fn known_balance(&self) -> Option<KnownBalance> {
        match (self.start, self.end) {
            (Some(s), None) => Some(KnownBalance::Start(s)),
            (None, Some(e)) => Some(KnownBalance::End(e)),
            _ => None,
        }
    }
}

// --- predicates shared by both treatments ---

pub(crate) fn is_verified_non_saver(f: &Facts) -> bool {
    f.start == Some(0.0) && f.end == Some(0.0) && f.flows_zero_or_absent
}

pub(crate) fn is_new_account(f: &Facts) -> bool {
    f.has_start == Some(false)
        && f.start == Some(0.0)
        && f.has_end == Some(true)
        && f.end.is_some_and(|e| e != 0.0)
}

pub(crate) fn is_closed_account(f: &Facts) -> bool {
    f.has_start == Some(true)
        && f.start.is_some_and(|s| s != 0.0)
        && f.has_end == Some(false)
        && f.end == Some(0.0)
}

/// True when one of the three leading states already claims the observation.
pub(crate) fn is_idle_or_open_close(f: &Facts) -> bool {
    is_verified_non_saver(f) || is_new_account(f) || is_closed_account(f)
}

/// Decomposer for classes with observed inflows and outflows: real estate,
/// business, brokerage stocks, and retirement accounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowAwareDecomposer {
    default_rate: Option<(RateKind, f64)>,
    implausible_rate_threshold: f64,
}

impl FlowAwareDecomposer {
    pub fn new(implausible_rate_threshold: f64) -> Self {
        Self {
            default_rate: None,
            implausible_rate_threshold,
        }
    }

    /// Supply the annual market-return proxy used to impute a missing
    /// balance when flows are known.
    pub fn with_default_rate(mut self, kind: RateKind, annual_rate: f64) -> Self {
        self.default_rate = Some((kind, annual_rate));
        self
    }

    fn matches(&self, tag: StateTag, f: &Facts) -> bool {
        let has_default = self.default_rate.is_some();
        match tag {
            StateTag::VerifiedNonSaver => is_verified_non_saver(f),
            StateTag::NewAccount => is_new_account(f),
            StateTag::ClosedAccount => is_closed_account(f),
            StateTag::BalancesAndFlow => {
                f.known_balances() == 2 && f.net_flow.is_some() && !is_idle_or_open_close(f)
            }
            StateTag::NoFlowNoBalance => f.known_balances() == 0 && f.net_flow.is_none(),
            StateTag::NoFlowOneBalance => f.known_balances() == 1 && f.net_flow.is_none(),
            StateTag::NoFlowTwoBalances => {
                f.known_balances() == 2 && f.net_flow.is_none() && !is_idle_or_open_close(f)
            }
            StateTag::FlowWithoutAnchor => {
                f.net_flow.is_some()
                    && (f.known_balances() == 0 || (f.known_balances() == 1 && !has_default))
            }
            StateTag::FlowAtDefaultRate => {
                f.net_flow.is_some() && f.known_balances() == 1 && has_default
            }
            StateTag::AssumedReturn => false,
        }
    }

    /// Every flow-aware state whose predicate holds for `obs`. Exactly one
    /// for a well-formed predicate set.
    pub fn matching_states(&self, obs: &AssetObservation) -> Vec<StateTag> {
        self.hits(&Facts::of(obs))
    }

    fn hits(&self, facts: &Facts) -> Vec<StateTag> {
        StateTag::FLOW_AWARE
            .into_iter()
            .filter(|&tag| self.matches(tag, facts))
            .collect()
    }

    fn build(&self, tag: StateTag, f: &Facts) -> Option<ClassificationState> {
        Some(match tag {
            StateTag::VerifiedNonSaver => ClassificationState::VerifiedNonSaver,
            StateTag::NewAccount => ClassificationState::NewAccount { end: f.end? },
            StateTag::ClosedAccount => ClassificationState::ClosedAccount { start: f.start? },
            StateTag::BalancesAndFlow => ClassificationState::BalancesAndFlow {
                start: f.start?,
                end: f.end?,
                net_flow: f.net_flow?,
            },
            StateTag::NoFlowNoBalance => ClassificationState::NoFlowNoBalance,
            StateTag::NoFlowOneBalance => ClassificationState::NoFlowOneBalance {
                known: f.known_balance()?,
            },
            StateTag::NoFlowTwoBalances => ClassificationState::NoFlowTwoBalances {
                start: f.start?,
                end: f.end?,
            },
            StateTag::FlowWithoutAnchor => ClassificationState::FlowWithoutAnchor {
                net_flow: f.net_flow?,
            },
            StateTag::FlowAtDefaultRate => {
                let (kind, annual_rate) = self.default_rate?;
                ClassificationState::FlowAtDefaultRate {
                    known: f.known_balance()?,
                    net_flow: f.net_flow?,
                    kind,
                    annual_rate,
                }
            }
            StateTag::AssumedReturn => return None,
        })
    }
}

impl AssetDecomposer for FlowAwareDecomposer {
    fn classify(
        &self,
        obs: &AssetObservation,
        ctx: &PeriodContext,
    ) -> Result<ClassificationState, ClassificationError> {
        let facts = Facts::of(obs);
        select_state(&self.hits(&facts), obs.class, ctx, |tag| self.build(tag, &facts))
    }

    fn resolve(&self, obs: &AssetObservation, state: ClassificationState, ctx: &PeriodContext) -> AssetOutcome {
        resolve_state(obs, state, ctx, self.implausible_rate_threshold)
    }
}

/// Turn the predicate hits for one observation into its single state.
pub(crate) fn select_state(
    hits: &[StateTag],
    class: AssetClass,
    ctx: &PeriodContext,
    build: impl FnOnce(StateTag) -> Option<ClassificationState>,
) -> Result<ClassificationState, ClassificationError> {
    let household_id = ctx.household_id;
    match hits {
        [tag] => build(*tag).ok_or(ClassificationError::Unclassified { household_id, class }),
        [] => Err(ClassificationError::Unclassified { household_id, class }),
        _ => Err(ClassificationError::Ambiguous {
            household_id,
            class,
            states: hits.to_vec(),
        }),
    }
}

/// Savings, capital gains, and balances for one state, before they are
/// turned back into reported orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Resolution {
    pub savings: Option<f64>,
    pub capital_gains: Option<f64>,
    pub total_change: Option<f64>,
    pub open_close_transfer: f64,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub start_imputed: bool,
    pub end_imputed: bool,
}

impl Resolution {
    fn unknown(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            savings: None,
            capital_gains: None,
            total_change: None,
            open_close_transfer: 0.0,
            start,
            end,
            start_imputed: false,
            end_imputed: false,
        }
    }

    fn zero(start: Option<f64>, end: Option<f64>) -> Self {
        Self {
            savings: Some(0.0),
            capital_gains: Some(0.0),
            total_change: Some(0.0),
            ..Self::unknown(start, end)
        }
    }

    /// Total change from both balances; capital gains is the residual.
    fn from_balances_and_savings(start: f64, end: f64, savings: Option<f64>, ctx: &PeriodContext) -> Self {
        let total = end * ctx.inflation_end - start * ctx.inflation_start;
        Self {
            savings,
            capital_gains: savings.map(|s| total - s),
            total_change: Some(total),
            ..Self::unknown(Some(start), Some(end))
        }
    }

    fn into_outcome(self, class: AssetClass, state: ClassificationState, ctx: &PeriodContext) -> AssetOutcome {
        let growth = derive_growth_rates(
            state.tag(),
            self.start,
            self.savings,
            self.capital_gains,
            self.total_change,
            ctx,
        );
        AssetOutcome {
            class,
            state,
            savings: self.savings,
            capital_gains: self.capital_gains,
            total_change_in_wealth: self.total_change,
            open_close_transfer: self.open_close_transfer,
            balance_start: self.start.map(|v| reported(class, v)),
            balance_end: self.end.map(|v| reported(class, v)),
            start_imputed: self.start_imputed,
            end_imputed: self.end_imputed,
            growth,
        }
    }
}

/// Back from net-worth orientation to the reported sign.
fn reported(class: AssetClass, signed: f64) -> f64 {
    let v = signed * class.orientation();
    if v == 0.0 { 0.0 } else { v }
}

/// Keep an imputed balance on the side of zero its class allows.
pub(crate) fn floor_imputed(class: AssetClass, signed: f64) -> f64 {
    if class.allows_negative_balance() {
        signed
    } else if class.is_liability() {
        signed.min(0.0)
    } else {
        signed.max(0.0)
    }
}

/// Compute the decomposition for an already-classified observation.
pub(crate) fn resolve_state(
    obs: &AssetObservation,
    state: ClassificationState,
    ctx: &PeriodContext,
    implausible_rate_threshold: f64,
) -> AssetOutcome {
    let class = obs.class;
    let facts = Facts::of(obs);
    let d = ctx.duration;

    let resolution = match &state {
        ClassificationState::VerifiedNonSaver => Resolution::zero(facts.start, facts.end),

        ClassificationState::NewAccount { end } => Resolution {
            open_close_transfer: end * ctx.inflation_end,
            ..Resolution::zero(Some(0.0), Some(*end))
        },

        ClassificationState::ClosedAccount { start } => Resolution {
            open_close_transfer: -start * ctx.inflation_start,
            ..Resolution::zero(Some(*start), Some(0.0))
        },

        ClassificationState::BalancesAndFlow {
            start,
            end,
            net_flow,
        } => Resolution::from_balances_and_savings(*start, *end, Some(net_flow * ctx.inflation_flow), ctx),

        ClassificationState::NoFlowNoBalance => Resolution::unknown(None, None),

        // Constant in real terms: no savings, no gains.
        ClassificationState::NoFlowOneBalance { known } => match *known {
            KnownBalance::Start(s) => Resolution {
                end_imputed: true,
                ..Resolution::zero(Some(s), Some(s * ctx.inflation_start / ctx.inflation_end))
            },
            KnownBalance::End(e) => Resolution {
                start_imputed: true,
                ..Resolution::zero(Some(e * ctx.inflation_end / ctx.inflation_start), Some(e))
            },
        },

        ClassificationState::NoFlowTwoBalances { start, end } => {
            let total = end * ctx.inflation_end - start * ctx.inflation_start;
            let rate = implied_annual_rate(*start, total, d, ctx.inflation_end);
            if rate.is_some_and(|r| r.abs() < implausible_rate_threshold) {
                Resolution::from_balances_and_savings(*start, *end, Some(0.0), ctx)
            } else {
                debug!(
                    household_id = ctx.household_id,
                    %class,
                    implied_rate = ?rate,
                    "classify: implied rate implausible, savings and capital gains unknown"
                );
                Resolution::from_balances_and_savings(*start, *end, None, ctx)
            }
        }

        ClassificationState::FlowWithoutAnchor { net_flow } => Resolution {
            savings: Some(net_flow * ctx.inflation_flow),
            ..Resolution::unknown(facts.start, facts.end)
        },

        ClassificationState::FlowAtDefaultRate {
            known,
            net_flow,
            annual_rate,
            ..
        } => {
            let growth = (1.0 + annual_rate).powf(d);
            let savings = Some(net_flow * ctx.inflation_flow);
            match *known {
                KnownBalance::Start(s) => {
                    let e = floor_imputed(class, s * growth + net_flow);
                    Resolution {
                        end_imputed: true,
                        ..Resolution::from_balances_and_savings(s, e, savings, ctx)
                    }
                }
                KnownBalance::End(e) => {
                    let s = floor_imputed(class, (e - net_flow) / growth);
                    Resolution {
                        start_imputed: true,
                        ..Resolution::from_balances_and_savings(s, e, savings, ctx)
                    }
                }
            }
        }

        ClassificationState::AssumedReturn {
            start,
            end,
            annual_rate,
        } => assumed_return(class, *start, *end, *annual_rate, ctx),
    };

    resolution.into_outcome(class, state, ctx)
}

/// Fixed-return decomposition: capital gains accrue on the start balance at
/// `annual_rate`, savings is the residual. A missing balance is projected
/// from the other at the same rate.
fn assumed_return(
    class: AssetClass,
    start: Option<f64>,
    end: Option<f64>,
    annual_rate: f64,
    ctx: &PeriodContext,
) -> Resolution {
    let growth = (1.0 + annual_rate).powf(ctx.duration);
    let (s, e, start_imputed, end_imputed) = match (start, end) {
        (Some(s), Some(e)) => (s, e, false, false),
        (Some(s), None) => (s, floor_imputed(class, s * growth), false, true),
        (None, Some(e)) => (floor_imputed(class, e / growth), e, true, false),
        (None, None) => return Resolution::unknown(None, None),
    };
    let total = e * ctx.inflation_end - s * ctx.inflation_start;
    let capital_gains = s * (growth - 1.0) * ctx.inflation_end;
    Resolution {
        savings: Some(total - capital_gains),
        capital_gains: Some(capital_gains),
        total_change: Some(total),
        open_close_transfer: 0.0,
        start: Some(s),
        end: Some(e),
        start_imputed,
        end_imputed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.20;

    fn ctx() -> PeriodContext {
        PeriodContext::nominal(1, 2.0)
    }

    fn inflated() -> PeriodContext {
        PeriodContext {
            household_id: 1,
            duration: 2.0,
            inflation_start: 1.21,
            inflation_end: 1.1,
            inflation_flow: 1.15,
        }
    }

    fn obs(class: AssetClass) -> AssetObservation {
        AssetObservation::unobserved(class)
    }

    fn decomposer() -> FlowAwareDecomposer {
        FlowAwareDecomposer::new(THRESHOLD)
    }

    fn run(d: &FlowAwareDecomposer, o: &AssetObservation, c: &PeriodContext) -> AssetOutcome {
        d.decompose(o, c).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "actual={actual}, expected={expected}"
        );
    }

    // --- state selection ---

    #[test]
    fn zero_balances_no_flows_is_verified_non_saver() {
        let o = obs(AssetClass::Business).balances(Some(0.0), Some(0.0));
        let out = run(&decomposer(), &o, &ctx());
        assert_eq!(out.state, ClassificationState::VerifiedNonSaver);
        assert_eq!(out.savings, Some(0.0));
        assert_eq!(out.capital_gains, Some(0.0));
        assert_eq!(out.total_change_in_wealth, Some(0.0));
    }

    #[test]
    fn not_owning_counts_as_zero_balance() {
        let o = obs(AssetClass::OtherRealEstate)
            .ownership(Some(false), Some(false))
            .flows(Some(0.0), None);
        assert_eq!(decomposer().matching_states(&o), vec![StateTag::VerifiedNonSaver]);
    }

    #[test]
    fn zero_balances_with_flow_is_balances_and_flow() {
        let o = obs(AssetClass::Business)
            .balances(Some(0.0), Some(0.0))
            .flows(Some(500.0), Some(500.0));
        assert_eq!(decomposer().matching_states(&o), vec![StateTag::BalancesAndFlow]);
    }

    #[test]
    fn new_account_needs_explicit_flags() {
        let flagged = obs(AssetClass::PrivateRetirement)
            .ownership(Some(false), Some(true))
            .balances(None, Some(80_000.0));
        assert_eq!(decomposer().matching_states(&flagged), vec![StateTag::NewAccount]);

        let unflagged = obs(AssetClass::PrivateRetirement).balances(Some(0.0), Some(80_000.0));
        assert_eq!(decomposer().matching_states(&unflagged), vec![StateTag::NoFlowTwoBalances]);
    }

    #[test]
    fn new_account_is_open_close_transfer() {
        let o = obs(AssetClass::EmployerRetirement)
            .ownership(Some(false), Some(true))
            .balances(Some(0.0), Some(50_000.0))
            .flows(Some(2_000.0), None);
        let out = run(&decomposer(), &o, &inflated());
        assert_eq!(out.state, ClassificationState::NewAccount { end: 50_000.0 });
        assert_close(out.open_close_transfer, 55_000.0);
        assert_eq!(out.savings, Some(0.0));
        assert_eq!(out.capital_gains, Some(0.0));
        assert_eq!(out.growth.total, None);
    }

    #[test]
    fn closed_account_is_negative_transfer() {
        let o = obs(AssetClass::BrokerageStocks)
            .ownership(Some(true), Some(false))
            .balances(Some(10_000.0), None);
        let out = run(&decomposer(), &o, &inflated());
        assert_eq!(out.state.tag(), StateTag::ClosedAccount);
        assert_close(out.open_close_transfer, -12_100.0);
        assert_eq!(out.savings, Some(0.0));
        assert_eq!(out.balance_end, Some(0.0));
    }

    #[test]
    fn every_flow_aware_combination_has_one_state() {
        let flags = [None, Some(false), Some(true)];
        let balances = [None, Some(0.0), Some(1_000.0)];
        let flows = [None, Some(0.0), Some(300.0)];
        for with_default in [false, true] {
            let d = if with_default {
                decomposer().with_default_rate(RateKind::Stock, 0.05)
            } else {
                decomposer()
            };
            for hs in flags {
                for he in flags {
                    for bs in balances {
                        for be in balances {
                            for inflow in flows {
                                for outflow in flows {
                                    let o = obs(AssetClass::BrokerageStocks)
                                        .ownership(hs, he)
                                        .balances(bs, be)
                                        .flows(inflow, outflow);
                                    let hits = d.matching_states(&o);
                                    assert_eq!(hits.len(), 1, "{o:?} matched {hits:?}");
                                    let state = d.classify(&o, &ctx()).unwrap();
                                    assert_eq!(state.tag(), hits[0], "{o:?}");
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    // --- formulas ---

    #[test]
    fn business_flow_explains_change() {
        let o = obs(AssetClass::Business)
            .balances(Some(11_000.0), Some(32_755.0))
            .flows(Some(22_000.0), Some(245.0));
        let out = run(&decomposer(), &o, &ctx());
        assert_eq!(out.state.tag(), StateTag::BalancesAndFlow);
        assert_close(out.total_change_in_wealth.unwrap(), 21_755.0);
        assert_close(out.savings.unwrap(), 21_755.0);
        assert_close(out.capital_gains.unwrap(), 0.0);
    }

    #[test]
    fn balances_and_flow_uses_three_factors() {
        let o = obs(AssetClass::OtherRealEstate)
            .balances(Some(100.0), Some(200.0))
            .flows(Some(40.0), None);
        let out = run(&decomposer(), &o, &inflated());
        assert_close(out.total_change_in_wealth.unwrap(), 200.0 * 1.1 - 100.0 * 1.21);
        assert_close(out.savings.unwrap(), 40.0 * 1.15);
        assert_close(
            out.capital_gains.unwrap(),
            out.total_change_in_wealth.unwrap() - out.savings.unwrap(),
        );
    }

    #[test]
    fn nothing_known_stays_unknown() {
        let out = run(&decomposer(), &obs(AssetClass::Home), &ctx());
        assert_eq!(out.state, ClassificationState::NoFlowNoBalance);
        assert_eq!(out.savings, None);
        assert_eq!(out.capital_gains, None);
        assert_eq!(out.total_change_in_wealth, None);
    }

    #[test]
    fn one_balance_held_constant_in_real_terms() {
        let o = obs(AssetClass::Business).balances(Some(1_100.0), None);
        let out = run(&decomposer(), &o, &inflated());
        assert_eq!(out.state.tag(), StateTag::NoFlowOneBalance);
        assert_eq!(out.savings, Some(0.0));
        assert_eq!(out.total_change_in_wealth, Some(0.0));
        assert!(out.end_imputed);
        assert_close(out.balance_end.unwrap(), 1_100.0 * 1.21 / 1.1);
    }

    #[test]
    fn end_balance_back_fills_start() {
        let o = obs(AssetClass::Business).balances(None, Some(1_100.0));
        let out = run(&decomposer(), &o, &inflated());
        assert!(out.start_imputed);
        assert_close(out.balance_start.unwrap(), 1_100.0 * 1.1 / 1.21);
    }

    #[test]
    fn plausible_implied_rate_is_capital_gains() {
        // 10% a year over two years.
        let o = obs(AssetClass::Home).balances(Some(100_000.0), Some(121_000.0));
        let out = run(&decomposer(), &o, &ctx());
        assert_eq!(out.savings, Some(0.0));
        assert_close(out.capital_gains.unwrap(), 21_000.0);
        assert_close(out.growth.capital_gains.unwrap(), 0.10);
        assert!(!out.is_rate_implausible());
    }

    #[test]
    fn implausible_implied_rate_leaves_split_unknown() {
        // 50% a year over two years.
        let o = obs(AssetClass::Home).balances(Some(100_000.0), Some(225_000.0));
        let out = run(&decomposer(), &o, &ctx());
        assert_eq!(out.savings, None);
        assert_eq!(out.capital_gains, None);
        assert_close(out.total_change_in_wealth.unwrap(), 125_000.0);
        assert!(out.is_rate_implausible());
    }

    #[test]
    fn threshold_is_strict() {
        // Exactly 20% a year is not plausible.
        let o = obs(AssetClass::Business).balances(Some(100.0), Some(144.0));
        let out = run(&FlowAwareDecomposer::new(0.20), &o, &ctx());
        let r = out.growth.total.unwrap();
        if r.abs() < 0.20 {
            assert_eq!(out.savings, Some(0.0));
        } else {
            assert_eq!(out.savings, None);
        }
        let looser = run(&FlowAwareDecomposer::new(0.25), &o, &ctx());
        assert_eq!(looser.savings, Some(0.0));
    }

    #[test]
    fn zero_start_without_flags_is_implausible() {
        let o = obs(AssetClass::BrokerageStocks).balances(Some(0.0), Some(5_000.0));
        let out = run(&decomposer(), &o, &ctx());
        assert!(out.is_rate_implausible());
        assert_eq!(out.total_change_in_wealth, Some(5_000.0));
    }

    #[test]
    fn flow_without_balances_knows_only_savings() {
        let o = obs(AssetClass::Home).flows(Some(3_000.0), None);
        let out = run(&decomposer().with_default_rate(RateKind::Stock, 0.05), &o, &inflated());
        assert_eq!(out.state, ClassificationState::FlowWithoutAnchor { net_flow: 3_000.0 });
        assert_close(out.savings.unwrap(), 3_450.0);
        assert_eq!(out.capital_gains, None);
        assert_eq!(out.total_change_in_wealth, None);
    }

    #[test]
    fn flow_with_one_balance_and_no_default_is_unanchored() {
        let o = obs(AssetClass::Business)
            .balances(Some(5_000.0), None)
            .flows(None, Some(1_000.0));
        let out = run(&decomposer(), &o, &ctx());
        assert_eq!(out.state.tag(), StateTag::FlowWithoutAnchor);
        assert_eq!(out.savings, Some(-1_000.0));
        assert_eq!(out.balance_end, None);
    }

    #[test]
    fn default_rate_projects_end_balance() {
        let o = obs(AssetClass::PrivateRetirement)
            .balances(Some(10_000.0), None)
            .flows(Some(2_000.0), None);
        let d = decomposer().with_default_rate(RateKind::Blended, 0.10);
        let out = run(&d, &o, &ctx());
        assert_eq!(out.state.tag(), StateTag::FlowAtDefaultRate);
        assert!(out.end_imputed);
        assert_close(out.balance_end.unwrap(), 10_000.0 * 1.21 + 2_000.0);
        assert_close(out.savings.unwrap(), 2_000.0);
        assert_close(out.capital_gains.unwrap(), 2_100.0);
        assert_close(out.growth.capital_gains.unwrap(), 0.10);
    }

    #[test]
    fn default_rate_projects_start_balance_backward() {
        let o = obs(AssetClass::BrokerageStocks)
            .balances(None, Some(14_100.0))
            .flows(Some(2_000.0), None);
        let d = decomposer().with_default_rate(RateKind::Stock, 0.10);
        let out = run(&d, &o, &ctx());
        assert!(out.start_imputed);
        assert_close(out.balance_start.unwrap(), 10_000.0);
        assert_close(out.capital_gains.unwrap(), 2_100.0);
    }

    #[test]
    fn imputed_balance_floored_at_zero() {
        let o = obs(AssetClass::BrokerageStocks)
            .balances(None, Some(1_000.0))
            .flows(Some(5_000.0), None);
        let d = decomposer().with_default_rate(RateKind::Stock, 0.0);
        let out = run(&d, &o, &ctx());
        assert_eq!(out.balance_start, Some(0.0));
        assert_close(out.savings.unwrap(), 5_000.0);
        assert_close(out.capital_gains.unwrap(), -4_000.0);
    }

    #[test]
    fn identity_holds_when_all_known() {
        let o = obs(AssetClass::EmployerRetirement)
            .balances(Some(40_000.0), Some(61_000.0))
            .flows(Some(6_000.0), Some(1_500.0));
        let out = run(&decomposer(), &o, &inflated());
        let (t, s, g) = (
            out.total_change_in_wealth.unwrap(),
            out.savings.unwrap(),
            out.capital_gains.unwrap(),
        );
        assert_close(t, s + g);
    }

    #[test]
    fn decomposer_is_object_safe() {
        let d = decomposer();
        let dyn_d: &dyn AssetDecomposer = &d;
        assert!(dyn_d.decompose(&obs(AssetClass::Home), &ctx()).is_ok());
    }

    // --- select_state ---

    #[test]
    fn no_hits_is_unclassified() {
        let err = select_state(&[], AssetClass::Home, &ctx(), |_| None).unwrap_err();
        assert_eq!(err, ClassificationError::Unclassified { household_id: 1, class: AssetClass::Home });
    }

    #[test]
    fn several_hits_is_ambiguous() {
        let hits = [StateTag::NoFlowOneBalance, StateTag::FlowWithoutAnchor];
        let err = select_state(&hits, AssetClass::Business, &ctx(), |_| None).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::Ambiguous {
                household_id: 1,
                class: AssetClass::Business,
                states: hits.to_vec(),
            }
        );
    }
}
