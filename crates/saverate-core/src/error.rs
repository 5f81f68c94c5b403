//! Error types for the Saverate engine.
//!
//! Every variant here is fatal: missing survey data is never an error, it
//! is carried as `None` through the computation.
use thiserror::Error;

use crate::outcome::StateTag;
use crate::types::{AssetClass, RateKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RateError {
    #[error("rate series not loaded: {kind}")] SeriesNotLoaded { kind: RateKind },
    #[error("empty rate series: {kind}")] EmptySeries { kind: RateKind },
    #[error("{kind} year {year} outside loaded range {first}..={last}")] YearOutOfRange { kind: RateKind, year: i32, first: i32, last: i32 },
    #[error("{kind} index level at {year} is not strictly positive")] NonPositiveLevel { kind: RateKind, year: i32 },
    #[error("{kind} annual rate {rate} at {year} is not above -100%")] InvalidAnnualRate { kind: RateKind, year: i32, rate: f64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("household {household_id}: no classification state matched {class}")] Unclassified { household_id: u64, class: AssetClass },
    #[error("household {household_id}: {class} matched several states: {states:?}")] Ambiguous { household_id: u64, class: AssetClass, states: Vec<StateTag> },
    #[error("census for {class} counted {counted} rows, expected {expected}")] CensusMismatch { class: AssetClass, counted: usize, expected: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid period: end year {end} must be after start year {start}")] InvalidPeriod { start: i32, end: i32 },
    #[error("household {household_id}: duplicate observation for {class}")] DuplicateAsset { household_id: u64, class: AssetClass },
    #[error("household {household_id}: negative {field} for {class}")] NegativeBalance { household_id: u64, class: AssetClass, field: &'static str },
    #[error("household {household_id}: non-finite {field} for {class}")] NonFinite { household_id: u64, class: AssetClass, field: &'static str },
    #[error("household {household_id}: non-finite {field}")] NonFiniteHousehold { household_id: u64, field: &'static str },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("implausible-rate threshold must be in (0, {max}]: got {threshold}")] InvalidThreshold { threshold: f64, max: f64 },
    #[error("assumed return for {class} must be finite and above -100%: got {rate}")] InvalidRate { class: AssetClass, rate: f64 },
    #[error("config parse: {0}")] Parse(String),
}

#[derive(Error, Debug)]
pub enum SaverateError {
    #[error(transparent)] Rate(#[from] RateError),
    #[error(transparent)] Classification(#[from] ClassificationError),
    #[error(transparent)] Input(#[from] InputError),
    #[error(transparent)] Config(#[from] ConfigError),
}
