//! Net-worth reconciliation from back-filled per-asset balances.
//!
//! Net worth is recomputed from the balances on each [`AssetOutcome`], which
//! already carry any imputation made during classification. Debts are
//! subtracted. Three variants are reported: everything, without home
//! equity, and without retirement accounts.

use saverate_core::config::MissingAssetPolicy;
use saverate_core::outcome::{AssetOutcome, HouseholdTotals, NetWorthReconciliation, NetWorthSpan};
use saverate_core::types::{AssetClass, HouseholdPeriod, PeriodContext};

use crate::aggregate::sum_with_policy;

fn net_worth(
    assets: &[AssetOutcome],
    include: &dyn Fn(AssetClass) -> bool,
    balance: fn(&AssetOutcome) -> Option<f64>,
    policy: MissingAssetPolicy,
) -> Option<f64> {
    let signed = assets
        .iter()
        .filter(|a| include(a.class))
        .map(|a| balance(a).map(|b| b * a.class.orientation()));
    sum_with_policy(signed, policy).0
}

fn span(
    assets: &[AssetOutcome],
    include: &dyn Fn(AssetClass) -> bool,
    ctx: &PeriodContext,
    policy: MissingAssetPolicy,
) -> NetWorthSpan {
    let start = net_worth(assets, include, |a| a.balance_start, policy);
    let end = net_worth(assets, include, |a| a.balance_end, policy);
    NetWorthSpan {
        start,
        end,
        real_change: start
            .zip(end)
            .map(|(s, e)| e * ctx.inflation_end - s * ctx.inflation_start),
    }
}

/// Recompute net worth for one household-period and compare it against the
/// reported figures and the aggregated change in wealth.
pub fn reconcile_net_worth(
    household: &HouseholdPeriod,
    assets: &[AssetOutcome],
    totals: &HouseholdTotals,
    ctx: &PeriodContext,
    policy: MissingAssetPolicy,
) -> NetWorthReconciliation {
    let all = span(assets, &|_| true, ctx, policy);
    let without_home = span(assets, &|c| c != AssetClass::Home, ctx, policy);
    let without_retirement = span(assets, &|c| !c.is_retirement(), ctx, policy);

    let unknown_balances = assets
        .iter()
        .map(|a| usize::from(a.balance_start.is_none()) + usize::from(a.balance_end.is_none()))
        .sum();

    let discrepancy = |reconciled: Option<f64>, reported: Option<f64>| {
        reconciled.zip(reported).map(|(r, p)| r - p)
    };
    let explained = totals
        .total_change_in_wealth
        .map(|t| t + totals.total_open_close_transfers);

    NetWorthReconciliation {
        reported_discrepancy_start: discrepancy(all.start, household.reported_net_worth_start),
        reported_discrepancy_end: discrepancy(all.end, household.reported_net_worth_end),
        discrepancy_vs_total_change: discrepancy(all.real_change, explained),
        with_home_and_retirement: all,
        without_home,
        without_retirement,
        unknown_balances,
    }
}
