//! Implied annualized growth rates.
//!
//! Solves `start * (1 + r)^duration * inflation_end = start * inflation_end + change`
//! for `r`. The result is diagnostic only and never feeds back into the
//! savings or capital-gains figures.

use saverate_core::outcome::{GrowthRates, StateTag};
use saverate_core::types::PeriodContext;

/// Annualized nominal rate that turns `start` into `start + change` (real,
/// end-year-deflated) over `duration` years.
///
/// Returns `None` for a zero or non-finite start, a non-positive duration or
/// inflation factor, or a change that would need a rate at or below -100%.
///
/// # Examples
///
/// ```
/// use saverate_engine::growth::implied_annual_rate;
/// let r = implied_annual_rate(100.0, 21.0, 2.0, 1.0).unwrap();
/// assert!((r - 0.10).abs() < 1e-12);
/// assert_eq!(implied_annual_rate(0.0, 21.0, 2.0, 1.0), None);
/// ```
pub fn implied_annual_rate(start: f64, change: f64, duration: f64, inflation_end: f64) -> Option<f64> {
    if start == 0.0 || !start.is_finite() || !change.is_finite() {
        return None;
    }
    if !(duration > 0.0 && inflation_end > 0.0) {
        return None;
    }
    let base = 1.0 + change / (start * inflation_end);
    if !(base > 0.0 && base.is_finite()) {
        return None;
    }
    Some(base.powf(1.0 / duration) - 1.0)
}

/// Growth diagnostics for one decomposed asset.
///
/// `start` is the nominal start balance after back-fill, signed by
/// net-worth contribution. Account openings and closings get no rates.
pub fn derive_growth_rates(
    tag: StateTag,
    start: Option<f64>,
    savings: Option<f64>,
    capital_gains: Option<f64>,
    total_change: Option<f64>,
    ctx: &PeriodContext,
) -> GrowthRates {
    let Some(start) = start.filter(|_| !tag.is_open_close()) else {
        return GrowthRates::default();
    };
    let rate = |change: Option<f64>| {
        change.and_then(|c| implied_annual_rate(start, c, ctx.duration, ctx.inflation_end))
    };
    GrowthRates {
        capital_gains: rate(capital_gains),
        savings: rate(savings),
        total: rate(total_change),
    }
}
