//! Integration test suite for the Saverate engine.
//!
//! The `tests/` directory holds the worked household scenarios and the
//! property tests for the engine's accounting invariants. Shared fixtures
//! live in [`helpers`].

pub mod helpers;
