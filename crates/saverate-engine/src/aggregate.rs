//! Household aggregation.
//!
//! Sums the per-asset decompositions, removes gifts and composition
//! transfers, and scales by duration and income to get the annual
//! active-savings rate.

use saverate_core::config::MissingAssetPolicy;
use saverate_core::outcome::{AssetOutcome, HouseholdTotals};
use saverate_core::types::{HouseholdPeriod, PeriodContext};

/// Sum of the known values and the count of unknown ones. Under
/// [`MissingAssetPolicy::Propagate`] a single unknown makes the sum unknown.
pub(crate) fn sum_with_policy(
    values: impl IntoIterator<Item = Option<f64>>,
    policy: MissingAssetPolicy,
) -> (Option<f64>, usize) {
    let mut sum = 0.0;
    let mut unknown = 0;
    for value in values {
        match value {
            Some(v) => sum += v,
            None => unknown += 1,
        }
    }
    let total = match policy {
        MissingAssetPolicy::Propagate if unknown > 0 => None,
        _ => Some(sum),
    };
    (total, unknown)
}

/// `amount / duration / income`, unknown unless income is strictly positive.
fn annual_rate(amount: Option<f64>, duration: f64, income: Option<f64>) -> Option<f64> {
    let income = income.filter(|i| *i > 0.0)?;
    if duration <= 0.0 {
        return None;
    }
    amount.map(|a| a / duration / income)
}

/// Household totals for one period from its per-asset outcomes.
pub fn aggregate_household(
    household: &HouseholdPeriod,
    assets: &[AssetOutcome],
    ctx: &PeriodContext,
    policy: MissingAssetPolicy,
) -> HouseholdTotals {
    let (total_gross_savings, unknown_savings_assets) =
        sum_with_policy(assets.iter().map(|a| a.savings), policy);
    let (total_capital_gains, unknown_capital_gains_assets) =
        sum_with_policy(assets.iter().map(|a| a.capital_gains), policy);
    let (total_change_in_wealth, unknown_change_assets) =
        sum_with_policy(assets.iter().map(|a| a.total_change_in_wealth), policy);
    let total_open_close_transfers: f64 = assets.iter().map(|a| a.open_close_transfer).sum();

    let net_asset_move = household.composition.net_asset_move() * ctx.inflation_flow;
    let large_gift_amount = household.gifts.large.unwrap_or(0.0) * ctx.inflation_flow;
    let small_gift_amount = household.gifts.small.unwrap_or(0.0) * ctx.inflation_flow;

    let net_active_savings = total_gross_savings.map(|gross| {
        gross + total_open_close_transfers - large_gift_amount - small_gift_amount + net_asset_move
    });

    let d = ctx.duration;
    HouseholdTotals {
        total_change_in_wealth,
        total_capital_gains,
        total_gross_savings,
        total_open_close_transfers,
        net_asset_move,
        large_gift_amount,
        small_gift_amount,
        net_active_savings,
        active_savings_rate_annual: annual_rate(
            net_active_savings,
            d,
            household.avg_real_before_tax_income,
        ),
        active_savings_rate_annual_after_tax: annual_rate(
            net_active_savings,
            d,
            household.avg_real_after_tax_income,
        ),
        gross_savings_rate_annual: annual_rate(
            total_gross_savings,
            d,
            household.avg_real_before_tax_income,
        ),
        unknown_savings_assets,
        unknown_capital_gains_assets,
        unknown_change_assets,
    }
}
