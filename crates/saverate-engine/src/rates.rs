//! Rate providers backed by loaded index series or constant rates.
//!
//! An [`IndexSeries`] stores index levels by year (a price index for
//! inflation, a total-return index for market series). The factor between
//! two years is the ratio of their levels; years between loaded points are
//! interpolated geometrically.

use std::collections::BTreeMap;

use saverate_core::error::RateError;
use saverate_core::traits::RateProvider;
use saverate_core::types::RateKind;

/// Index levels for one [`RateKind`], keyed by year.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    kind: RateKind,
    levels: BTreeMap<i32, f64>,
}

impl IndexSeries {
    /// Build a series from `(year, level)` pairs. Levels must be finite and
    /// strictly positive.
    pub fn from_levels(
        kind: RateKind,
        levels: impl IntoIterator<Item = (i32, f64)>,
    ) -> Result<Self, RateError> {
        let levels: BTreeMap<i32, f64> = levels.into_iter().collect();
        if levels.is_empty() {
            return Err(RateError::EmptySeries { kind });
        }
        if let Some((&year, _)) = levels.iter().find(|(_, l)| !(l.is_finite() && **l > 0.0)) {
            return Err(RateError::NonPositiveLevel { kind, year });
        }
        Ok(Self { kind, levels })
    }

    /// Build a series from consecutive annual rates, where `rates[i]` is the
    /// rate earned during `base_year + i`. The base year has level 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::types::RateKind;
    /// use saverate_engine::rates::IndexSeries;
    /// let s = IndexSeries::from_annual_rates(RateKind::Inflation, 2000, &[0.10, 0.10]).unwrap();
    /// assert!((s.factor(2000, 2002).unwrap() - 1.21).abs() < 1e-12);
    /// ```
    pub fn from_annual_rates(kind: RateKind, base_year: i32, rates: &[f64]) -> Result<Self, RateError> {
        let mut levels = BTreeMap::new();
        let mut level = 1.0;
        levels.insert(base_year, level);
        let mut year = base_year;
        for &rate in rates {
            if !rate.is_finite() || rate <= -1.0 {
                return Err(RateError::InvalidAnnualRate { kind, year, rate });
            }
            let next = year.checked_add(1).ok_or(RateError::YearOutOfRange {
                kind,
                year,
                first: base_year,
                last: year,
            })?;
            level *= 1.0 + rate;
            levels.insert(next, level);
            year = next;
        }
        Ok(Self { kind, levels })
    }

    pub fn kind(&self) -> RateKind {
        self.kind
    }

    pub fn first_year(&self) -> i32 {
        self.levels.keys().next().copied().unwrap_or_default()
    }

    pub fn last_year(&self) -> i32 {
        self.levels.keys().next_back().copied().unwrap_or_default()
    }

    /// Index level at `year`, interpolated geometrically between the
    /// nearest loaded years.
    pub fn level(&self, year: i32) -> Result<f64, RateError> {
        if let Some(&level) = self.levels.get(&year) {
            return Ok(level);
        }
        let below = self.levels.range(..year).next_back();
        let above = self.levels.range(year..).next();
        match (below, above) {
            (Some((&y0, &l0)), Some((&y1, &l1))) => {
                let t = (f64::from(year) - f64::from(y0)) / (f64::from(y1) - f64::from(y0));
                Ok(l0 * (l1 / l0).powf(t))
            }
            _ => Err(RateError::YearOutOfRange {
                kind: self.kind,
                year,
                first: self.first_year(),
                last: self.last_year(),
            }),
        }
    }

    /// `level(to) / level(from)`.
    pub fn factor(&self, from_year: i32, to_year: i32) -> Result<f64, RateError> {
        Ok(self.level(to_year)? / self.level(from_year)?)
    }
}

/// A set of index series, one per [`RateKind`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    series: BTreeMap<RateKind, IndexSeries>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series, replacing any series already loaded for its kind.
    pub fn with_series(mut self, series: IndexSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn insert(&mut self, series: IndexSeries) {
        self.series.insert(series.kind(), series);
    }

    pub fn series(&self, kind: RateKind) -> Option<&IndexSeries> {
        self.series.get(&kind)
    }
}

impl RateProvider for RateTable {
    fn cumulative_factor(&self, kind: RateKind, from_year: i32, to_year: i32) -> Result<f64, RateError> {
        self.series
            .get(&kind)
            .ok_or(RateError::SeriesNotLoaded { kind })?
            .factor(from_year, to_year)
    }
}

/// Constant annual rates for every kind. Zero everywhere by default, which
/// makes every real amount equal to its nominal amount.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatRates {
    pub inflation: f64,
    pub stock: f64,
    pub bond: f64,
    pub blended: f64,
}

impl FlatRates {
    pub fn with(mut self, kind: RateKind, annual_rate: f64) -> Self {
        match kind {
            RateKind::Inflation => self.inflation = annual_rate,
            RateKind::Stock => self.stock = annual_rate,
            RateKind::Bond => self.bond = annual_rate,
            RateKind::Blended => self.blended = annual_rate,
        }
        self
    }

    pub fn rate(&self, kind: RateKind) -> f64 {
        match kind {
            RateKind::Inflation => self.inflation,
            RateKind::Stock => self.stock,
            RateKind::Bond => self.bond,
            RateKind::Blended => self.blended,
        }
    }
}

impl RateProvider for FlatRates {
    fn cumulative_factor(&self, kind: RateKind, from_year: i32, to_year: i32) -> Result<f64, RateError> {
        let rate = self.rate(kind);
        if !rate.is_finite() || rate <= -1.0 {
            return Err(RateError::InvalidAnnualRate {
                kind,
                year: from_year,
                rate,
            });
        }
        Ok((1.0 + rate).powf(f64::from(to_year) - f64::from(from_year)))
    }
}
