//! Engine constants. All currency amounts are plain `f64` units of the
//! survey currency; rates are fractions (0.05 = 5%).

/// Number of asset classes tracked per household-period.
pub const ASSET_CLASS_COUNT: usize = 10;

/// Number of classification states for flow-aware asset classes.
pub const FLOW_AWARE_STATE_COUNT: usize = 9;

/// Number of classification states for fixed-return asset classes.
pub const FIXED_RETURN_STATE_COUNT: usize = 4;

/// Default magnitude above which an implied annual capital-gains rate is
/// considered implausible for a balance pair with no observed flow.
///
/// # Examples
///
/// ```
/// use saverate_core::constants::DEFAULT_IMPLAUSIBLE_RATE_THRESHOLD;
/// assert_eq!(DEFAULT_IMPLAUSIBLE_RATE_THRESHOLD, 0.20);
/// ```
pub const DEFAULT_IMPLAUSIBLE_RATE_THRESHOLD: f64 = 0.20;

/// Upper bound accepted for a configured plausibility threshold (1000% a year).
pub const MAX_IMPLAUSIBLE_RATE_THRESHOLD: f64 = 10.0;

/// Default real spread over inflation assumed for the "other assets" class.
pub const OTHER_ASSETS_REAL_SPREAD: f64 = 0.01;

/// Relative tolerance used when checking accounting identities.
pub const IDENTITY_TOLERANCE: f64 = 1e-9;
