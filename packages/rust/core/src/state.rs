//! Run state for one record and the patches steps return.
//!
//! Steps never mutate [`RunState`]. Each one reads a snapshot and returns a
//! [`StatePatch`] holding only what it changed; the controller applies it.

use std::collections::HashMap;

use serde::Serialize;

use hazfill_shared::{FillConfig, Record};

use crate::capability::SearchHit;

/// Tier label recorded for phase 2 fills.
pub const GENERAL_TIER: &str = "general";

/// Provenance of one filled field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillRecord {
    /// Value written into the record (possibly review-annotated).
    pub value: String,
    /// Self-reported extraction confidence in `[0, 1]`.
    pub confidence: f64,
    /// URL the value was taken from, when known.
    pub source_url: Option<String>,
    /// Tier name, or [`GENERAL_TIER`].
    pub tier: String,
}

impl FillRecord {
    pub fn is_general(&self) -> bool {
        self.tier == GENERAL_TIER
    }
}

/// Fill records keyed by field name.
pub type FillMap = HashMap<&'static str, FillRecord>;

/// Where the run goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    SearchTier,
    SearchGeneral,
    End,
}

/// Everything one record's run tracks between steps.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Input record, never modified.
    pub original: Record,
    /// Record being filled.
    pub working: Record,
    /// Fields not yet filled, in declaration order.
    pub pending: Vec<&'static str>,
    pub filled: FillMap,
    /// Cached result sets keyed by tier name or general attempt key.
    pub search_results: HashMap<String, Vec<SearchHit>>,
    /// Cursor into the tier catalog.
    pub tier_index: usize,
    /// General searches attempted so far.
    pub general_attempts: u32,
    pub settings: FillConfig,
    pub next: Route,
}

impl RunState {
    /// Seed a run: every empty field of `record` starts pending.
    pub fn new(record: &Record, settings: FillConfig) -> Self {
        Self {
            original: record.clone(),
            working: record.clone(),
            pending: record.empty_field_names(),
            filled: FillMap::new(),
            search_results: HashMap::new(),
            tier_index: 0,
            general_attempts: 0,
            settings,
            next: Route::SearchTier,
        }
    }

    pub fn is_pending(&self, field: &str) -> bool {
        self.pending.iter().any(|p| *p == field)
    }

    /// Cached results under `key`; empty when nothing was cached.
    pub fn results_for(&self, key: &str) -> &[SearchHit] {
        self.search_results
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Merge a step's deltas into the state.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(working) = patch.working {
            self.working = working;
        }
        if let Some(pending) = patch.pending {
            self.pending = pending;
        }
        if let Some(filled) = patch.filled {
            self.filled = filled;
        }
        if let Some((key, hits)) = patch.search_results {
            self.search_results.insert(key, hits);
        }
        if let Some(index) = patch.tier_index {
            debug_assert!(index >= self.tier_index, "tier cursor moved backwards");
            self.tier_index = index;
        }
        if let Some(attempts) = patch.general_attempts {
            debug_assert!(attempts >= self.general_attempts, "general counter decreased");
            self.general_attempts = attempts;
        }
        if let Some(next) = patch.next {
            self.next = next;
        }
        debug_assert!(
            self.pending.iter().all(|f| !self.filled.contains_key(f)),
            "pending and filled overlap"
        );
    }
}

/// Cache key for the `attempt`-th general search (zero based).
pub fn general_key(attempt: u32) -> String {
    format!("{GENERAL_TIER}_{attempt}")
}

/// Deltas produced by one step. `None` leaves a slot unchanged.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub working: Option<Record>,
    pub pending: Option<Vec<&'static str>>,
    pub filled: Option<FillMap>,
    pub search_results: Option<(String, Vec<SearchHit>)>,
    pub tier_index: Option<usize>,
    pub general_attempts: Option<u32>,
    pub next: Option<Route>,
}

impl StatePatch {
    /// A patch that changes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.working.is_none()
            && self.pending.is_none()
            && self.filled.is_none()
            && self.search_results.is_none()
            && self.tier_index.is_none()
            && self.general_attempts.is_none()
            && self.next.is_none()
    }
}
