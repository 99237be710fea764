//! Search and extraction steps.
//!
//! Each step reads a [`RunState`] snapshot and returns a [`StatePatch`].
//! Capability failures are logged and turned into patches; they never
//! abort a run.

use tracing::{debug, info, instrument, warn};

use hazfill_shared::Record;

use crate::capability::{Extractor, Searcher};
use crate::merge::should_overwrite;
use crate::parse::{CandidateUpdate, parse_updates};
use crate::prompt::{
    EXTRACTION_SYSTEM_PROMPT, PromptMode, build_context, build_extraction_prompt,
    build_general_context, general_query, tier_query,
};
use crate::router::MAX_GENERAL_ATTEMPTS;
use crate::state::{FillMap, FillRecord, GENERAL_TIER, RunState, StatePatch, general_key};
use crate::tiers::TierCatalog;

/// Confidence used when a tiered update omits one.
pub const DEFAULT_TIER_CONFIDENCE: f64 = 0.5;

/// Confidence used when a general update omits one.
pub const DEFAULT_GENERAL_CONFIDENCE: f64 = 0.2;

/// General fills below this confidence are flagged for review.
pub const REVIEW_CONFIDENCE: f64 = 0.4;

pub const REVIEW_SUFFIX: &str = " (review required)";

/// Fields listed in one general-phase prompt.
const GENERAL_PROMPT_FIELDS: usize = 20;

/// Search the tier under the cursor and cache its results by tier name.
#[instrument(skip_all, fields(tier_index = state.tier_index))]
pub async fn search_tier(
    state: &RunState,
    catalog: &TierCatalog,
    searcher: &dyn Searcher,
) -> StatePatch {
    let Some(tier) = catalog.get(state.tier_index) else {
        warn!(tier_index = state.tier_index, "tier cursor outside catalog");
        return StatePatch::none();
    };

    let chemical = state.original.identifying_name();
    let domains = tier.search_domains();
    let query = tier_query(chemical, domains.is_some());
    info!(tier = %tier.name, chemical, "searching tier");

    let hits = match searcher.search(&query, domains).await {
        Ok(resp) => {
            let hits = resp.into_hits();
            info!(tier = %tier.name, results = hits.len(), "tier search done");
            hits
        }
        Err(e) => {
            warn!(tier = %tier.name, error = %e, "tier search failed");
            Vec::new()
        }
    };

    StatePatch {
        search_results: Some((tier.name.clone(), hits)),
        ..StatePatch::default()
    }
}

/// Extract pending fields from the current tier's cached results.
///
/// Every candidate passes the merge gate; accepted fields leave pending.
#[instrument(skip_all, fields(tier_index = state.tier_index))]
pub async fn extract_tier(
    state: &RunState,
    catalog: &TierCatalog,
    extractor: &dyn Extractor,
) -> StatePatch {
    let Some(tier) = catalog.get(state.tier_index) else {
        return StatePatch::none();
    };
    if state.pending.is_empty() {
        return StatePatch::none();
    }
    let results = state.results_for(&tier.name);
    if results.is_empty() {
        info!(tier = %tier.name, "no results, skipping extraction");
        return StatePatch::none();
    }

    let settings = &state.settings;
    let context = build_context(
        results,
        settings.max_results_per_search,
        settings.max_snippet_chars,
    );
    let chemical = state.original.identifying_name();
    let prompt = build_extraction_prompt(chemical, &state.pending, &context, PromptMode::Tier);

    let Some(updates) = complete(extractor, &prompt, &tier.name).await else {
        return StatePatch::none();
    };

    let mut fills = Fills::from_state(state);
    for update in updates {
        let Some((field, value)) = admissible(state, &update) else {
            continue;
        };
        let confidence = update.confidence.unwrap_or(DEFAULT_TIER_CONFIDENCE);
        if !should_overwrite(field, confidence, fills.filled.get(field), settings) {
            continue;
        }
        fills.accept(
            field,
            FillRecord {
                value,
                confidence,
                source_url: update.source_url,
                tier: tier.name.clone(),
            },
        );
    }

    info!(
        tier = %tier.name,
        filled = fills.accepted,
        pending = fills.pending.len(),
        "tier extraction done"
    );
    fills.into_patch()
}

/// Run one bounded general search over the remaining fields.
///
/// The attempt counter advances even when the search fails; a failed
/// attempt caches nothing.
#[instrument(skip_all, fields(attempt = state.general_attempts))]
pub async fn search_general(state: &RunState, searcher: &dyn Searcher) -> StatePatch {
    let attempt = state.general_attempts;
    if state.pending.is_empty() || attempt >= MAX_GENERAL_ATTEMPTS {
        return StatePatch::none();
    }

    let query = general_query(state.original.identifying_name(), &state.pending);
    info!(
        attempt = attempt + 1,
        max = MAX_GENERAL_ATTEMPTS,
        "general search"
    );

    let search_results = match searcher.search(&query, None).await {
        Ok(resp) => Some((general_key(attempt), resp.into_hits())),
        Err(e) => {
            warn!(error = %e, "general search failed");
            None
        }
    };

    StatePatch {
        search_results,
        general_attempts: Some(attempt + 1),
        ..StatePatch::default()
    }
}

/// Lenient extraction for the latest general attempt.
///
/// Any usable value for a pending field is accepted. Low-confidence or
/// unsupported values carry [`REVIEW_SUFFIX`].
#[instrument(skip_all, fields(attempt = state.general_attempts))]
pub async fn extract_general(state: &RunState, extractor: &dyn Extractor) -> StatePatch {
    if state.pending.is_empty() || state.general_attempts == 0 {
        return StatePatch::none();
    }

    let results = state.results_for(&general_key(state.general_attempts - 1));
    let context = build_general_context(results);
    let fields = &state.pending[..state.pending.len().min(GENERAL_PROMPT_FIELDS)];
    let prompt = build_extraction_prompt(
        state.original.identifying_name(),
        fields,
        &context,
        PromptMode::General,
    );

    let Some(updates) = complete(extractor, &prompt, GENERAL_TIER).await else {
        return StatePatch::none();
    };

    let mut fills = Fills::from_state(state);
    for update in updates {
        let Some((field, value)) = admissible(state, &update) else {
            continue;
        };
        let confidence = update.confidence.unwrap_or(DEFAULT_GENERAL_CONFIDENCE);
        let value = if confidence < REVIEW_CONFIDENCE || results.is_empty() {
            format!("{value}{REVIEW_SUFFIX}")
        } else {
            value
        };
        fills.accept(
            field,
            FillRecord {
                value,
                confidence,
                source_url: None,
                tier: GENERAL_TIER.to_string(),
            },
        );
    }

    info!(
        filled = fills.accepted,
        pending = fills.pending.len(),
        "general extraction done"
    );
    fills.into_patch()
}

/// Ask the extractor and parse its answer; `None` on failure or no updates.
async fn complete(
    extractor: &dyn Extractor,
    prompt: &str,
    scope: &str,
) -> Option<Vec<CandidateUpdate>> {
    let text = match extractor.complete(EXTRACTION_SYSTEM_PROMPT, prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(scope, error = %e, "extraction failed");
            return None;
        }
    };
    let updates = parse_updates(text.trim());
    if updates.is_empty() {
        debug!(scope, "extraction returned no updates");
        return None;
    }
    Some(updates)
}

/// Field and value of an update that targets a field pending in the
/// snapshot and carries a usable value.
fn admissible(state: &RunState, update: &CandidateUpdate) -> Option<(&'static str, String)> {
    let field = state
        .pending
        .iter()
        .copied()
        .find(|p| *p == update.field)?;
    let value = update.value.clone()?;
    Some((field, value))
}

/// Working copies of the mutable run slots while a step applies updates.
struct Fills {
    working: Record,
    pending: Vec<&'static str>,
    filled: FillMap,
    accepted: usize,
}

impl Fills {
    fn from_state(state: &RunState) -> Self {
        Self {
            working: state.working.clone(),
            pending: state.pending.clone(),
            filled: state.filled.clone(),
            accepted: 0,
        }
    }

    fn accept(&mut self, field: &'static str, fill: FillRecord) {
        if let Err(e) = self.working.set(field, Some(&fill.value)) {
            warn!(field, error = %e, "could not write field");
            return;
        }
        debug!(field, confidence = fill.confidence, tier = %fill.tier, "field filled");
        self.pending.retain(|p| *p != field);
        self.filled.insert(field, fill);
        self.accepted += 1;
    }

    fn into_patch(self) -> StatePatch {
        if self.accepted == 0 {
            return StatePatch::none();
        }
        StatePatch {
            working: Some(self.working),
            pending: Some(self.pending),
            filled: Some(self.filled),
            ..StatePatch::default()
        }
    }
}
