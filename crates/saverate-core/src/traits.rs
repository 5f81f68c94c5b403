//! Trait interfaces for the Saverate engine.
//!
//! These traits define the contracts between crates:
//! - [`RateProvider`]: cumulative return and inflation factors (saverate-engine
//!   ships table-backed and flat implementations)
//! - [`AssetDecomposer`]: per-asset classification and savings/capital-gains
//!   split (saverate-engine implements one per asset treatment)

use crate::error::{ClassificationError, RateError};
use crate::outcome::{AssetOutcome, ClassificationState};
use crate::types::{AssetObservation, PeriodContext, RateKind};

/// Pure lookup of cumulative nominal factors from a loaded time series.
///
/// A missing series or year is a configuration error, never missing data.
pub trait RateProvider: Send + Sync {
    /// Cumulative factor for `kind` from `from_year` to `to_year`.
    ///
    /// For [`RateKind::Inflation`] this converts a nominal amount observed in
    /// `from_year` into `to_year` prices. For market series it is the growth
    /// of one unit invested at `from_year` and held to `to_year`.
    /// `from_year > to_year` yields the reciprocal.
    fn cumulative_factor(&self, kind: RateKind, from_year: i32, to_year: i32) -> Result<f64, RateError>;

    /// Price-level factor converting `from_year` amounts into `to_year` prices.
    ///
    /// Default implementation delegates to [`cumulative_factor`](Self::cumulative_factor).
    fn inflation_factor(&self, from_year: i32, to_year: i32) -> Result<f64, RateError> {
        self.cumulative_factor(RateKind::Inflation, from_year, to_year)
    }

    /// Geometric average annual rate of `kind` between two years.
    ///
    /// Default implementation: `factor^(1 / years) - 1`, and 0 for an empty span.
    fn annualized_rate(&self, kind: RateKind, from_year: i32, to_year: i32) -> Result<f64, RateError> {
        if from_year == to_year {
            return Ok(0.0);
        }
        let factor = self.cumulative_factor(kind, from_year, to_year)?;
        let years = f64::from(to_year) - f64::from(from_year);
        Ok(factor.powf(1.0 / years) - 1.0)
    }
}

/// Classification and decomposition of one asset observation.
///
/// `classify` must select exactly one state; selecting none or several is
/// a [`ClassificationError`]. `resolve` is infallible: missing data comes
/// back as `None` fields on the outcome.
pub trait AssetDecomposer {
    fn classify(
        &self,
        obs: &AssetObservation,
        ctx: &PeriodContext,
    ) -> Result<ClassificationState, ClassificationError>;

    fn resolve(&self, obs: &AssetObservation, state: ClassificationState, ctx: &PeriodContext) -> AssetOutcome;

    /// Default implementation: [`classify`](Self::classify) then [`resolve`](Self::resolve).
    fn decompose(&self, obs: &AssetObservation, ctx: &PeriodContext) -> Result<AssetOutcome, ClassificationError> {
        let state = self.classify(obs, ctx)?;
        Ok(self.resolve(obs, state, ctx))
    }
}
