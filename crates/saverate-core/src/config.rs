//! Engine configuration.
//!
//! Provides [`EngineConfig`] with defaults for the plausibility threshold,
//! the missing-data policy, default market-return proxies for flow-aware
//! classes, and assumed returns for fixed-return classes. Every field has a
//! default, so a partial JSON document overrides only what it names.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_IMPLAUSIBLE_RATE_THRESHOLD, MAX_IMPLAUSIBLE_RATE_THRESHOLD, OTHER_ASSETS_REAL_SPREAD,
};
use crate::error::ConfigError;
use crate::types::{AssetClass, RateKind};

/// What the household aggregator and reconciler do with an unknown
/// per-asset figure.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingAssetPolicy {
    /// Unknown contributes zero, so one missing minor asset does not make
    /// the whole household total unknown.
    #[default]
    TreatAsZero,
    /// Any unknown contribution makes the total unknown.
    Propagate,
}

/// Which year's price level deflates flows reported over a period.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowDeflation {
    /// `start_year + duration / 2`.
    #[default]
    Midpoint,
    EndYear,
}

/// Assumed annual return for a fixed-return class.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "basis", content = "rate", rename_all = "snake_case")]
pub enum ReturnAssumption {
    Nominal(f64),
    /// Real spread added to the period's average annual inflation.
    RealOverInflation(f64),
}

impl ReturnAssumption {
    fn rate(self) -> f64 {
        match self {
            Self::Nominal(r) | Self::RealOverInflation(r) => r,
        }
    }

    /// Nominal annual rate given the period's average annual inflation.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::config::ReturnAssumption;
    /// assert_eq!(ReturnAssumption::Nominal(0.03).nominal_rate(0.02), 0.03);
    /// let r = ReturnAssumption::RealOverInflation(0.01).nominal_rate(0.02);
    /// assert!((r - 0.0302).abs() < 1e-12);
    /// ```
    pub fn nominal_rate(self, annual_inflation: f64) -> f64 {
        match self {
            Self::Nominal(r) => r,
            Self::RealOverInflation(spread) => (1.0 + spread) * (1.0 + annual_inflation) - 1.0,
        }
    }
}

/// Optional market-return proxy per flow-aware class.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct FlowAwareDefaults {
    pub home: Option<RateKind>,
    pub other_real_estate: Option<RateKind>,
    pub business: Option<RateKind>,
    pub brokerage_stocks: Option<RateKind>,
    pub private_retirement: Option<RateKind>,
    pub employer_retirement: Option<RateKind>,
}

impl Default for FlowAwareDefaults {
    fn default() -> Self {
        Self {
            home: None,
            other_real_estate: None,
            business: None,
            brokerage_stocks: Some(RateKind::Stock),
            private_retirement: Some(RateKind::Blended),
            employer_retirement: Some(RateKind::Blended),
        }
    }
}

impl FlowAwareDefaults {
    /// The proxy series for `class`, `None` for classes without one or for
    /// fixed-return classes.
    pub fn kind_for(&self, class: AssetClass) -> Option<RateKind> {
        match class {
            AssetClass::Home => self.home,
            AssetClass::OtherRealEstate => self.other_real_estate,
            AssetClass::Business => self.business,
            AssetClass::BrokerageStocks => self.brokerage_stocks,
            AssetClass::PrivateRetirement => self.private_retirement,
            AssetClass::EmployerRetirement => self.employer_retirement,
            _ => None,
        }
    }
}

/// Assumed returns for the four fixed-return classes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct FixedReturnAssumptions {
    pub checking_and_savings: ReturnAssumption,
    pub vehicles: ReturnAssumption,
    pub other_assets: ReturnAssumption,
    pub other_debts: ReturnAssumption,
}

impl Default for FixedReturnAssumptions {
    fn default() -> Self {
        Self {
            checking_and_savings: ReturnAssumption::RealOverInflation(0.0),
            vehicles: ReturnAssumption::RealOverInflation(0.0),
            other_assets: ReturnAssumption::RealOverInflation(OTHER_ASSETS_REAL_SPREAD),
            other_debts: ReturnAssumption::RealOverInflation(0.0),
        }
    }
}

impl FixedReturnAssumptions {
    pub fn assumption_for(&self, class: AssetClass) -> Option<ReturnAssumption> {
        match class {
            AssetClass::CheckingAndSavings => Some(self.checking_and_savings),
            AssetClass::Vehicles => Some(self.vehicles),
            AssetClass::OtherAssets => Some(self.other_assets),
            AssetClass::OtherDebts => Some(self.other_debts),
            _ => None,
        }
    }
}

/// Configuration for the savings engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub implausible_rate_threshold: f64,
    pub missing_asset_policy: MissingAssetPolicy,
    pub flow_deflation: FlowDeflation,
    pub flow_aware: FlowAwareDefaults,
    pub fixed_return: FixedReturnAssumptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            implausible_rate_threshold: DEFAULT_IMPLAUSIBLE_RATE_THRESHOLD,
            missing_asset_policy: MissingAssetPolicy::default(),
            flow_deflation: FlowDeflation::default(),
            flow_aware: FlowAwareDefaults::default(),
            fixed_return: FixedReturnAssumptions::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.implausible_rate_threshold;
        if !(threshold.is_finite() && threshold > 0.0 && threshold <= MAX_IMPLAUSIBLE_RATE_THRESHOLD) {
            return Err(ConfigError::InvalidThreshold {
                threshold,
                max: MAX_IMPLAUSIBLE_RATE_THRESHOLD,
            });
        }
        for class in AssetClass::ALL {
            let Some(assumption) = self.fixed_return.assumption_for(class) else {
                continue;
            };
            let rate = assumption.rate();
            if !rate.is_finite() || rate <= -1.0 {
                return Err(ConfigError::InvalidRate { class, rate });
            }
        }
        Ok(())
    }
}
