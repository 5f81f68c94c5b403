//! # saverate-core
//! Foundation types, configuration, and traits for the Saverate engine.

pub mod config;
pub mod constants;
pub mod error;
pub mod outcome;
pub mod traits;
pub mod types;
