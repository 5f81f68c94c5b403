//! Fixed-return asset classification.
//!
//! Checking and savings, vehicles, other assets, and other debts have no
//! observed flows. Their capital gains come from an assumed annual return
//! on the start balance; savings is whatever the balances say is left.

use saverate_core::error::ClassificationError;
use saverate_core::outcome::{AssetOutcome, ClassificationState, StateTag};
use saverate_core::traits::AssetDecomposer;
use saverate_core::types::{AssetObservation, PeriodContext};

use crate::classify::{
    Facts, is_closed_account, is_idle_or_open_close, is_new_account, is_verified_non_saver,
    resolve_state, select_state,
};

/// Decomposer for classes priced with an assumed nominal annual return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedReturnDecomposer {
    annual_rate: f64,
}

impl FixedReturnDecomposer {
    pub fn new(annual_rate: f64) -> Self {
        Self { annual_rate }
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    fn matches(tag: StateTag, f: &Facts) -> bool {
        match tag {
            StateTag::VerifiedNonSaver => is_verified_non_saver(f),
            StateTag::NewAccount => is_new_account(f),
            StateTag::ClosedAccount => is_closed_account(f),
            StateTag::AssumedReturn => !is_idle_or_open_close(f),
            _ => false,
        }
    }

    /// Every fixed-return state whose predicate holds for `obs`.
    pub fn matching_states(&self, obs: &AssetObservation) -> Vec<StateTag> {
        Self::hits(&Facts::without_flows(obs))
    }

    fn hits(facts: &Facts) -> Vec<StateTag> {
        StateTag::FIXED_RETURN
            .into_iter()
            .filter(|&tag| Self::matches(tag, facts))
            .collect()
    }
}

impl AssetDecomposer for FixedReturnDecomposer {
    fn classify(
        &self,
        obs: &AssetObservation,
        ctx: &PeriodContext,
    ) -> Result<ClassificationState, ClassificationError> {
        let facts = Facts::without_flows(obs);
        select_state(&Self::hits(&facts), obs.class, ctx, |tag| {
            Some(match tag {
                StateTag::VerifiedNonSaver => ClassificationState::VerifiedNonSaver,
                StateTag::NewAccount => ClassificationState::NewAccount { end: facts.end? },
                StateTag::ClosedAccount => ClassificationState::ClosedAccount { start: facts.start? },
                StateTag::AssumedReturn => ClassificationState::AssumedReturn {
                    start: facts.start,
                    end: facts.end,
                    annual_rate: self.annual_rate,
                },
                _ => return None,
            })
        })
    }

    /// Fixed-return classes never hit the plausibility check, so any
    /// threshold works here.
    fn resolve(&self, obs: &AssetObservation, state: ClassificationState, ctx: &PeriodContext) -> AssetOutcome {
        resolve_state(obs, state, ctx, f64::INFINITY)
    }
}
