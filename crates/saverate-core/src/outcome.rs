//! Output records: classification states, per-asset decompositions,
//! household totals, and net-worth reconciliation.
//!
//! Amounts are real (target-year prices) unless a field says otherwise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{FIXED_RETURN_STATE_COUNT, FLOW_AWARE_STATE_COUNT};
use crate::types::{AssetClass, Period, RateKind};

/// Fieldless name of a classification state, used for counting.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    VerifiedNonSaver,
    NewAccount,
    ClosedAccount,
    BalancesAndFlow,
    NoFlowNoBalance,
    NoFlowOneBalance,
    NoFlowTwoBalances,
    FlowWithoutAnchor,
    FlowAtDefaultRate,
    AssumedReturn,
}

impl StateTag {
    /// Flow-aware states in precedence order.
    pub const FLOW_AWARE: [StateTag; FLOW_AWARE_STATE_COUNT] = [
        StateTag::VerifiedNonSaver,
        StateTag::NewAccount,
        StateTag::ClosedAccount,
        StateTag::BalancesAndFlow,
        StateTag::NoFlowNoBalance,
        StateTag::NoFlowOneBalance,
        StateTag::NoFlowTwoBalances,
        StateTag::FlowWithoutAnchor,
        StateTag::FlowAtDefaultRate,
    ];

    /// Fixed-return states in precedence order.
    pub const FIXED_RETURN: [StateTag; FIXED_RETURN_STATE_COUNT] = [
        StateTag::VerifiedNonSaver,
        StateTag::NewAccount,
        StateTag::ClosedAccount,
        StateTag::AssumedReturn,
    ];

    /// Account opening or closing events carry no growth diagnostics.
    pub fn is_open_close(self) -> bool {
        matches!(self, Self::NewAccount | Self::ClosedAccount)
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The one balance observed when the other is missing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum KnownBalance {
    Start(f64),
    End(f64),
}

/// The data-availability state an asset observation falls into, carrying
/// exactly the inputs its formulas need.
///
/// Balances and flows here are nominal and signed by net-worth contribution:
/// a debt of 500 is carried as `-500.0`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClassificationState {
    VerifiedNonSaver,
    NewAccount { end: f64 },
    ClosedAccount { start: f64 },
    BalancesAndFlow { start: f64, end: f64, net_flow: f64 },
    NoFlowNoBalance,
    NoFlowOneBalance { known: KnownBalance },
    NoFlowTwoBalances { start: f64, end: f64 },
    FlowWithoutAnchor { net_flow: f64 },
    FlowAtDefaultRate { known: KnownBalance, net_flow: f64, kind: RateKind, annual_rate: f64 },
    AssumedReturn { start: Option<f64>, end: Option<f64>, annual_rate: f64 },
}

impl ClassificationState {
    pub fn tag(&self) -> StateTag {
        match self {
            Self::VerifiedNonSaver => StateTag::VerifiedNonSaver,
            Self::NewAccount { .. } => StateTag::NewAccount,
            Self::ClosedAccount { .. } => StateTag::ClosedAccount,
            Self::BalancesAndFlow { .. } => StateTag::BalancesAndFlow,
            Self::NoFlowNoBalance => StateTag::NoFlowNoBalance,
            Self::NoFlowOneBalance { .. } => StateTag::NoFlowOneBalance,
            Self::NoFlowTwoBalances { .. } => StateTag::NoFlowTwoBalances,
            Self::FlowWithoutAnchor { .. } => StateTag::FlowWithoutAnchor,
            Self::FlowAtDefaultRate { .. } => StateTag::FlowAtDefaultRate,
            Self::AssumedReturn { .. } => StateTag::AssumedReturn,
        }
    }
}

/// Implied annualized nominal rates, for diagnostics only.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct GrowthRates {
    pub capital_gains: Option<f64>,
    pub savings: Option<f64>,
    pub total: Option<f64>,
}

/// Savings/capital-gains decomposition of one asset class for one period.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssetOutcome {
    pub class: AssetClass,
    pub state: ClassificationState,
    pub savings: Option<f64>,
    pub capital_gains: Option<f64>,
    pub total_change_in_wealth: Option<f64>,
    /// Whole balance of an opened (positive) or closed (negative) account.
    pub open_close_transfer: f64,
    /// Nominal start balance as reported, or imputed when back-filled.
    pub balance_start: Option<f64>,
    /// Nominal end balance as reported, or imputed when back-filled.
    pub balance_end: Option<f64>,
    pub start_imputed: bool,
    pub end_imputed: bool,
    pub growth: GrowthRates,
}

impl AssetOutcome {
    /// Two balances and no flow, but the implied rate was too extreme to
    /// book the change as capital gains.
    pub fn is_rate_implausible(&self) -> bool {
        matches!(self.state, ClassificationState::NoFlowTwoBalances { .. }) && self.savings.is_none()
    }
}

/// Household-level sums and the active-savings figure.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HouseholdTotals {
    pub total_change_in_wealth: Option<f64>,
    pub total_capital_gains: Option<f64>,
    pub total_gross_savings: Option<f64>,
    pub total_open_close_transfers: f64,
    pub net_asset_move: f64,
    pub large_gift_amount: f64,
    pub small_gift_amount: f64,
    pub net_active_savings: Option<f64>,
    /// Ratio, not a percentage.
    pub active_savings_rate_annual: Option<f64>,
    pub active_savings_rate_annual_after_tax: Option<f64>,
    pub gross_savings_rate_annual: Option<f64>,
    /// Asset classes whose savings were unknown before aggregation.
    pub unknown_savings_assets: usize,
    pub unknown_capital_gains_assets: usize,
    pub unknown_change_assets: usize,
}

/// Net worth at both ends of a period and its real change.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct NetWorthSpan {
    /// Nominal, start-year prices.
    pub start: Option<f64>,
    /// Nominal, end-year prices.
    pub end: Option<f64>,
    pub real_change: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NetWorthReconciliation {
    pub with_home_and_retirement: NetWorthSpan,
    pub without_home: NetWorthSpan,
    pub without_retirement: NetWorthSpan,
    /// Balances (start and end, all classes) still unknown after back-fill.
    pub unknown_balances: usize,
    /// Reconciled minus reported net worth at the start, nominal.
    pub reported_discrepancy_start: Option<f64>,
    /// Reconciled minus reported net worth at the end, nominal.
    pub reported_discrepancy_end: Option<f64>,
    /// Reconciled real change minus (total change in wealth + open/close transfers).
    pub discrepancy_vs_total_change: Option<f64>,
}

/// Back-filled end balances of one period, keyed by asset class.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClosingBalances {
    pub household_id: u64,
    pub year: i32,
    pub balances: BTreeMap<AssetClass, f64>,
}

/// Everything the engine computes for one household-period.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HouseholdOutcome {
    pub household_id: u64,
    pub period: Period,
    pub weight: f64,
    /// One entry per asset class, in [`AssetClass::ALL`] order.
    pub assets: Vec<AssetOutcome>,
    pub totals: HouseholdTotals,
    pub net_worth: NetWorthReconciliation,
}

impl HouseholdOutcome {
    pub fn asset(&self, class: AssetClass) -> Option<&AssetOutcome> {
        self.assets.iter().find(|a| a.class == class)
    }

    /// End balances to seed the next period's unknown start balances.
    pub fn closing_balances(&self) -> ClosingBalances {
        ClosingBalances {
            household_id: self.household_id,
            year: self.period.end_year,
            balances: self
                .assets
                .iter()
                .filter_map(|a| a.balance_end.map(|b| (a.class, b)))
                .collect(),
        }
    }
}
