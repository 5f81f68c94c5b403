//! # saverate-engine: Household active-savings decomposition.
//!
//! For each of ten asset classes and each household-period, this crate
//! splits the observed change in value into savings (net new money) and
//! capital gains (market appreciation), then aggregates to a household
//! active-savings figure:
//! - **Flow-aware classification**: nine ordered data-availability states
//!   for classes with observed inflows and outflows.
//! - **Fixed-return classification**: four states for classes priced with
//!   an assumed annual return.
//! - **Growth-rate derivation**: implied annualized rates, diagnostic only.
//! - **Household aggregation**: totals net of gifts and composition
//!   transfers, and the annual active-savings rate.
//! - **Net-worth reconciliation**: net worth recomputed from back-filled
//!   balances, for cross-validation.

pub mod aggregate;
pub mod classify;
pub mod engine;
pub mod fixed;
pub mod growth;
pub mod rates;
pub mod reconcile;

pub use classify::FlowAwareDecomposer;
pub use engine::{ClassificationCensus, PopulationOutcome, SavingsEngine};
pub use fixed::FixedReturnDecomposer;
pub use growth::implied_annual_rate;
pub use rates::{FlatRates, IndexSeries, RateTable};
