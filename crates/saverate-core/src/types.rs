//! Input value types: asset classes, periods, and household observations.
//!
//! All currency fields are nominal amounts in the year they were observed.
//! `None` means the value is unknown; it is never silently read as zero
//! except where an explicit ownership flag says the household holds none.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::ASSET_CLASS_COUNT;
use crate::error::InputError;
use crate::outcome::ClosingBalances;

/// The ten asset classes tracked for every household-period.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Home,
    OtherRealEstate,
    Business,
    BrokerageStocks,
    CheckingAndSavings,
    Vehicles,
    OtherAssets,
    OtherDebts,
    PrivateRetirement,
    EmployerRetirement,
}

/// How an asset class is decomposed into savings and capital gains.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    /// Inflows and outflows are observed; nine classification states.
    FlowAware,
    /// No flows are observed; an assumed rate of return drives four states.
    FixedReturn,
}

impl AssetClass {
    /// Every asset class, in reporting order.
    pub const ALL: [AssetClass; ASSET_CLASS_COUNT] = [
        AssetClass::Home,
        AssetClass::OtherRealEstate,
        AssetClass::Business,
        AssetClass::BrokerageStocks,
        AssetClass::CheckingAndSavings,
        AssetClass::Vehicles,
        AssetClass::OtherAssets,
        AssetClass::OtherDebts,
        AssetClass::PrivateRetirement,
        AssetClass::EmployerRetirement,
    ];

    /// Position of this class in [`AssetClass::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn treatment(self) -> Treatment {
        match self {
            Self::CheckingAndSavings | Self::Vehicles | Self::OtherAssets | Self::OtherDebts => {
                Treatment::FixedReturn
            }
            _ => Treatment::FlowAware,
        }
    }

    /// Whether balances of this class are amounts owed.
    pub fn is_liability(self) -> bool {
        matches!(self, Self::OtherDebts)
    }

    /// Sign of this class's contribution to net worth.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::types::AssetClass;
    /// assert_eq!(AssetClass::Home.orientation(), 1.0);
    /// assert_eq!(AssetClass::OtherDebts.orientation(), -1.0);
    /// ```
    pub fn orientation(self) -> f64 {
        if self.is_liability() { -1.0 } else { 1.0 }
    }

    /// Equity classes are reported net of their own debt and may be negative.
    pub fn allows_negative_balance(self) -> bool {
        matches!(self, Self::Home | Self::OtherRealEstate | Self::Business)
    }

    pub fn is_retirement(self) -> bool {
        matches!(self, Self::PrivateRetirement | Self::EmployerRetirement)
    }

    /// Short snake_case label used in logs and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::OtherRealEstate => "other_real_estate",
            Self::Business => "business",
            Self::BrokerageStocks => "brokerage_stocks",
            Self::CheckingAndSavings => "checking_and_savings",
            Self::Vehicles => "vehicles",
            Self::OtherAssets => "other_assets",
            Self::OtherDebts => "other_debts",
            Self::PrivateRetirement => "private_retirement",
            Self::EmployerRetirement => "employer_retirement",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Time series served by a [`RateProvider`](crate::traits::RateProvider).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Stock,
    Bond,
    Blended,
    Inflation,
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stock => "stock",
            Self::Bond => "bond",
            Self::Blended => "blended",
            Self::Inflation => "inflation",
        })
    }
}

/// A multi-year observation window and the year whose prices all real
/// amounts are expressed in.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Period {
    pub start_year: i32,
    pub end_year: i32,
    pub target_year: i32,
}

impl Period {
    /// Create a period, rejecting windows that do not move forward in time.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::types::Period;
    /// let p = Period::new(1999, 2001, 2019).unwrap();
    /// assert_eq!(p.duration(), 2);
    /// assert!(Period::new(2001, 2001, 2019).is_err());
    /// ```
    pub fn new(start_year: i32, end_year: i32, target_year: i32) -> Result<Self, InputError> {
        let period = Self {
            start_year,
            end_year,
            target_year,
        };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.end_year <= self.start_year {
            return Err(InputError::InvalidPeriod {
                start: self.start_year,
                end: self.end_year,
            });
        }
        Ok(())
    }

    /// Length of the window in whole years (0 for an invalid window).
    pub fn duration(&self) -> u32 {
        if self.end_year > self.start_year {
            self.end_year.abs_diff(self.start_year)
        } else {
            0
        }
    }

    pub fn duration_years(&self) -> f64 {
        f64::from(self.duration())
    }

    /// Year halfway through the window, rounded down.
    pub fn midpoint_year(&self) -> i32 {
        self.start_year.saturating_add_unsigned(self.duration() / 2)
    }
}

/// Ownership, balances, and flows for one asset class over one period.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AssetObservation {
    pub class: AssetClass,
    pub has_asset_start: Option<bool>,
    pub has_asset_end: Option<bool>,
    pub balance_start: Option<f64>,
    pub balance_end: Option<f64>,
    /// Money moved into the asset (contributions, purchases, principal paid).
    pub inflow: Option<f64>,
    /// Money moved out of the asset (withdrawals, sales, new borrowing).
    pub outflow: Option<f64>,
}

impl AssetObservation {
    /// An observation with every field unknown.
    pub fn unobserved(class: AssetClass) -> Self {
        Self {
            class,
            has_asset_start: None,
            has_asset_end: None,
            balance_start: None,
            balance_end: None,
            inflow: None,
            outflow: None,
        }
    }

    pub fn balances(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.balance_start = start;
        self.balance_end = end;
        self
    }

    pub fn ownership(mut self, start: Option<bool>, end: Option<bool>) -> Self {
        self.has_asset_start = start;
        self.has_asset_end = end;
        self
    }

    pub fn flows(mut self, inflow: Option<f64>, outflow: Option<f64>) -> Self {
        self.inflow = inflow;
        self.outflow = outflow;
        self
    }

    /// Start balance, reading "does not own" as a known zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::types::{AssetClass, AssetObservation};
    /// let obs = AssetObservation::unobserved(AssetClass::Business).ownership(Some(false), None);
    /// assert_eq!(obs.effective_start(), Some(0.0));
    /// assert_eq!(obs.effective_end(), None);
    /// ```
    pub fn effective_start(&self) -> Option<f64> {
        effective_balance(self.balance_start, self.has_asset_start)
    }

    /// End balance, reading "does not own" as a known zero.
    pub fn effective_end(&self) -> Option<f64> {
        effective_balance(self.balance_end, self.has_asset_end)
    }

    /// `inflow - outflow`, known when at least one side was reported.
    pub fn net_flow(&self) -> Option<f64> {
        match (self.inflow, self.outflow) {
            (None, None) => None,
            (inflow, outflow) => Some(inflow.unwrap_or(0.0) - outflow.unwrap_or(0.0)),
        }
    }

    /// True when neither flow was reported or every reported flow is zero.
    pub fn flows_zero_or_absent(&self) -> bool {
        self.inflow.is_none_or(|v| v == 0.0) && self.outflow.is_none_or(|v| v == 0.0)
    }

    pub(crate) fn validate(&self, household_id: u64) -> Result<(), InputError> {
        let class = self.class;
        let fields = [
            ("balance_start", self.balance_start, class.allows_negative_balance()),
            ("balance_end", self.balance_end, class.allows_negative_balance()),
            ("inflow", self.inflow, false),
            ("outflow", self.outflow, false),
        ];
        for (field, value, may_be_negative) in fields {
            let Some(v) = value else { continue };
            if !v.is_finite() {
                return Err(InputError::NonFinite {
                    household_id,
                    class,
                    field,
                });
            }
            if v < 0.0 && !may_be_negative {
                return Err(InputError::NegativeBalance {
                    household_id,
                    class,
                    field,
                });
            }
        }
        Ok(())
    }
}

fn effective_balance(balance: Option<f64>, owns: Option<bool>) -> Option<f64> {
    match (balance, owns) {
        (Some(v), _) => Some(v),
        (None, Some(false)) => Some(0.0),
        (None, _) => None,
    }
}

/// Main-home values and mortgage, reported separately by the survey.
///
/// Converts into a [`AssetObservation`] for [`AssetClass::Home`] whose
/// balances are home equity. For a household that stayed in the same home,
/// improvements and mortgage principal paid are savings. A move, or an
/// unknown mortgage or improvements figure, makes the flows unknown; an
/// unknown mortgage on an owned home also makes that side's equity unknown.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HomeEquityRecord {
    pub owns_start: Option<bool>,
    pub owns_end: Option<bool>,
    pub value_start: Option<f64>,
    pub value_end: Option<f64>,
    pub mortgage_start: Option<f64>,
    pub mortgage_end: Option<f64>,
    pub improvements: Option<f64>,
    pub moved: bool,
}

impl HomeEquityRecord {
    pub fn into_observation(self) -> AssetObservation {
        // A household that does not own the home carries no mortgage on it.
        let mortgage_start = effective_balance(self.mortgage_start, self.owns_start);
        let mortgage_end = effective_balance(self.mortgage_end, self.owns_end);
        let equity = |value: Option<f64>, mortgage: Option<f64>| Some(value? - mortgage?);
        let balance_start = equity(self.value_start, mortgage_start);
        let balance_end = equity(self.value_end, mortgage_end);

        let flows = match (self.moved, mortgage_start, mortgage_end, self.improvements) {
            (false, Some(m0), Some(m1), Some(improvements)) => {
                let principal_paid = m0 - m1;
                // New borrowing against the same home is equity taken out.
                Some((improvements + principal_paid.max(0.0), (-principal_paid).max(0.0)))
            }
            _ => None,
        };

        AssetObservation {
            class: AssetClass::Home,
            has_asset_start: self.owns_start,
            has_asset_end: self.owns_end,
            balance_start,
            balance_end,
            inflow: flows.map(|(inflow, _)| inflow),
            outflow: flows.map(|(_, outflow)| outflow),
        }
    }
}

/// Gifts and inheritances received during the period.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct GiftReceipts {
    pub large: Option<f64>,
    pub small: Option<f64>,
}

/// Assets and debts carried across the household boundary by members
/// joining or leaving during the period.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct CompositionTransfers {
    pub assets_moved_in: Option<f64>,
    pub assets_moved_out: Option<f64>,
    pub debts_moved_in: Option<f64>,
    pub debts_moved_out: Option<f64>,
}

impl CompositionTransfers {
    /// Net wealth that left the household with departing members, minus net
    /// wealth brought in by joining members. Absent amounts count as zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use saverate_core::types::CompositionTransfers;
    /// let t = CompositionTransfers { assets_moved_in: Some(10.0), ..Default::default() };
    /// assert_eq!(t.net_asset_move(), -10.0);
    /// ```
    pub fn net_asset_move(&self) -> f64 {
        let out = self.assets_moved_out.unwrap_or(0.0) - self.debts_moved_out.unwrap_or(0.0);
        let inn = self.assets_moved_in.unwrap_or(0.0) - self.debts_moved_in.unwrap_or(0.0);
        out - inn
    }
}

/// One household observed over one period, with every asset observation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HouseholdPeriod {
    pub household_id: u64,
    pub period: Period,
    pub weight: f64,
    /// Average real pre-tax income over the period, in target-year prices.
    pub avg_real_before_tax_income: Option<f64>,
    /// Average real after-tax income over the period, in target-year prices.
    pub avg_real_after_tax_income: Option<f64>,
    #[serde(default)]
    pub gifts: GiftReceipts,
    #[serde(default)]
    pub composition: CompositionTransfers,
    #[serde(default)]
    pub reported_net_worth_start: Option<f64>,
    #[serde(default)]
    pub reported_net_worth_end: Option<f64>,
    pub assets: Vec<AssetObservation>,
}

impl HouseholdPeriod {
    pub fn new(household_id: u64, period: Period) -> Self {
        Self {
            household_id,
            period,
            weight: 1.0,
            avg_real_before_tax_income: None,
            avg_real_after_tax_income: None,
            gifts: GiftReceipts::default(),
            composition: CompositionTransfers::default(),
            reported_net_worth_start: None,
            reported_net_worth_end: None,
            assets: Vec::new(),
        }
    }

    /// Add or replace the observation for `obs.class`.
    pub fn with_asset(mut self, obs: AssetObservation) -> Self {
        match self.assets.iter_mut().find(|a| a.class == obs.class) {
            Some(existing) => *existing = obs,
            None => self.assets.push(obs),
        }
        self
    }

    pub fn with_income(mut self, before_tax: Option<f64>, after_tax: Option<f64>) -> Self {
        self.avg_real_before_tax_income = before_tax;
        self.avg_real_after_tax_income = after_tax;
        self
    }

    pub fn asset(&self, class: AssetClass) -> Option<&AssetObservation> {
        self.assets.iter().find(|a| a.class == class)
    }

    /// The observation for `class`, or an all-unknown one if none was given.
    pub fn observation(&self, class: AssetClass) -> AssetObservation {
        self.asset(class)
            .cloned()
            .unwrap_or_else(|| AssetObservation::unobserved(class))
    }

    /// Fill unknown start balances from the back-filled end balances of the
    /// previous period for the same household. Known balances and observed
    /// ownership flags are kept; a zero prior balance is not used for an
    /// asset the household reports owning at the start.
    ///
    /// Returns the record unchanged when `prior` belongs to another
    /// household or does not end in this period's start year.
    pub fn with_prior_balances(&self, prior: &ClosingBalances) -> Self {
        let mut next = self.clone();
        if prior.household_id != self.household_id || prior.year != self.period.start_year {
            return next;
        }
        for (&class, &balance) in &prior.balances {
            let mut obs = next.observation(class);
            if obs.effective_start().is_some() {
                continue;
            }
            if obs.has_asset_start == Some(true) && balance == 0.0 {
                continue;
            }
            obs.balance_start = Some(balance);
            if obs.has_asset_start.is_none() {
                obs.has_asset_start = Some(balance != 0.0);
            }
            next = next.with_asset(obs);
        }
        next
    }

    /// Reject records the engine cannot interpret.
    pub fn validate(&self) -> Result<(), InputError> {
        self.period.validate()?;
        let household_id = self.household_id;
        let mut seen = [false; ASSET_CLASS_COUNT];
        for obs in &self.assets {
            let slot = &mut seen[obs.class.index()];
            if *slot {
                return Err(InputError::DuplicateAsset {
                    household_id,
                    class: obs.class,
                });
            }
            *slot = true;
            obs.validate(household_id)?;
        }
        let scalars = [
            ("weight", Some(self.weight)),
            ("avg_real_before_tax_income", self.avg_real_before_tax_income),
            ("avg_real_after_tax_income", self.avg_real_after_tax_income),
            ("gifts.large", self.gifts.large),
            ("gifts.small", self.gifts.small),
            ("composition.assets_moved_in", self.composition.assets_moved_in),
            ("composition.assets_moved_out", self.composition.assets_moved_out),
            ("composition.debts_moved_in", self.composition.debts_moved_in),
            ("composition.debts_moved_out", self.composition.debts_moved_out),
            ("reported_net_worth_start", self.reported_net_worth_start),
            ("reported_net_worth_end", self.reported_net_worth_end),
        ];
        for (field, value) in scalars {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(InputError::NonFiniteHousehold {
                    household_id,
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Inflation factors and duration for one household-period, resolved by
/// the engine from its rate provider.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PeriodContext {
    pub household_id: u64,
    pub duration: f64,
    /// Converts start-year nominal amounts into target-year prices.
    pub inflation_start: f64,
    /// Converts end-year nominal amounts into target-year prices.
    pub inflation_end: f64,
    /// Converts flows reported over the period into target-year prices.
    pub inflation_flow: f64,
}

impl PeriodContext {
    /// A context with no inflation adjustment.
    pub fn nominal(household_id: u64, duration: f64) -> Self {
        Self {
            household_id,
            duration,
            inflation_start: 1.0,
            inflation_end: 1.0,
            inflation_flow: 1.0,
        }
    }
}
