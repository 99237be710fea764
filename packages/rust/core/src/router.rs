//! Forward-only transition function between steps.

use tracing::debug;

use crate::state::{Route, RunState, StatePatch};
use crate::tiers::TierCatalog;

/// General searches allowed per record.
pub const MAX_GENERAL_ATTEMPTS: u32 = 3;

/// Decide the next step after an extraction.
///
/// Advances the tier cursor until the last consulted tier, then allows up
/// to [`MAX_GENERAL_ATTEMPTS`] general rounds while fields remain pending.
pub fn route(state: &RunState, catalog: &TierCatalog) -> StatePatch {
    let last = catalog.last_index(state.settings.enable_open_web_fallback);

    if state.tier_index < last {
        let next_index = state.tier_index + 1;
        debug!(
            tier = catalog.get(next_index).map(|t| t.name.as_str()),
            "advancing tier"
        );
        return StatePatch {
            tier_index: Some(next_index),
            next: Some(Route::SearchTier),
            ..StatePatch::default()
        };
    }

    let next = if !state.pending.is_empty() && state.general_attempts < MAX_GENERAL_ATTEMPTS {
        Route::SearchGeneral
    } else {
        Route::End
    };
    StatePatch {
        next: Some(next),
        ..StatePatch::default()
    }
}
