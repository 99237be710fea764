//! Confidence-gated merge policy.
//!
//! First fills only need to clear `confidence_threshold`. Replacing an
//! existing fill needs `existing + overwrite_delta`, so repeated weak
//! answers cannot flip a value back and forth.

use tracing::trace;

use hazfill_shared::FillConfig;

use crate::state::FillRecord;

/// Slack for float rounding when comparing against the bar.
const CONFIDENCE_EPSILON: f64 = 1e-9;

/// Whether a candidate with `candidate_confidence` may be written to `field`.
pub fn should_overwrite(
    field: &str,
    candidate_confidence: f64,
    existing: Option<&FillRecord>,
    config: &FillConfig,
) -> bool {
    let bar = match existing {
        None => config.confidence_threshold,
        Some(prev) => prev.confidence + config.overwrite_delta,
    };
    let accept = candidate_confidence + CONFIDENCE_EPSILON >= bar;
    trace!(field, candidate_confidence, bar, accept, "merge gate");
    accept
}
