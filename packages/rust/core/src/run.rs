//! Run controller: drives one record through the fill state machine.

use serde::Serialize;
use tracing::{info, instrument};

use hazfill_shared::{FIELDS, FillConfig, Record};

use crate::capability::{Extractor, Searcher};
use crate::router::{MAX_GENERAL_ATTEMPTS, route};
use crate::state::{FillRecord, Route, RunState};
use crate::step;
use crate::tiers::TierCatalog;

/// Provenance of one field, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFill {
    pub field: &'static str,
    #[serde(flatten)]
    pub fill: FillRecord,
}

/// Per-record counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FillSummary {
    pub filled: usize,
    /// Fields still empty after every tier and general attempt.
    pub pending: usize,
    pub tier_filled: usize,
    pub general_filled: usize,
    /// Search/extract rounds executed.
    pub steps: usize,
}

/// Result of filling one record.
#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub record: Record,
    pub fills: Vec<FieldFill>,
    pub unfilled: Vec<&'static str>,
    pub summary: FillSummary,
}

/// Fills records using a searcher, an extractor and a tier catalog.
pub struct Filler<'a> {
    searcher: &'a dyn Searcher,
    extractor: &'a dyn Extractor,
    catalog: &'a TierCatalog,
    settings: FillConfig,
}

impl<'a> Filler<'a> {
    pub fn new(
        searcher: &'a dyn Searcher,
        extractor: &'a dyn Extractor,
        catalog: &'a TierCatalog,
        settings: FillConfig,
    ) -> Self {
        Self {
            searcher,
            extractor,
            catalog,
            settings,
        }
    }

    /// Upper bound on rounds for any record.
    pub fn max_steps(&self) -> usize {
        self.catalog.len() + MAX_GENERAL_ATTEMPTS as usize
    }

    /// Run `record` to completion.
    ///
    /// A record with no empty fields is returned unchanged without any
    /// capability call.
    #[instrument(skip_all, fields(chemical = %record.identifying_name()))]
    pub async fn fill(&self, record: &Record) -> FillOutcome {
        let mut state = RunState::new(record, self.settings.clone());
        if state.pending.is_empty() {
            info!("record already complete");
            return outcome(state, 0);
        }

        info!(pending = state.pending.len(), "filling record");
        let mut steps = 0;
        loop {
            match state.next {
                Route::SearchTier => {
                    let patch = step::search_tier(&state, self.catalog, self.searcher).await;
                    state.apply(patch);
                    let patch = step::extract_tier(&state, self.catalog, self.extractor).await;
                    state.apply(patch);
                }
                Route::SearchGeneral => {
                    let patch = step::search_general(&state, self.searcher).await;
                    state.apply(patch);
                    let patch = step::extract_general(&state, self.extractor).await;
                    state.apply(patch);
                }
                Route::End => break,
            }
            steps += 1;
            debug_assert!(steps <= self.max_steps(), "router failed to terminate");
            let patch = route(&state, self.catalog);
            state.apply(patch);
        }

        let result = outcome(state, steps);
        info!(
            filled = result.summary.filled,
            pending = result.summary.pending,
            tier_filled = result.summary.tier_filled,
            general_filled = result.summary.general_filled,
            steps,
            "record complete"
        );
        result
    }
}

fn outcome(state: RunState, steps: usize) -> FillOutcome {
    let fills: Vec<FieldFill> = FIELDS
        .iter()
        .filter_map(|d| {
            state.filled.get(d.name).map(|fill| FieldFill {
                field: d.name,
                fill: fill.clone(),
            })
        })
        .collect();
    let general_filled = fills.iter().filter(|f| f.fill.is_general()).count();

    FillOutcome {
        summary: FillSummary {
            filled: fills.len(),
            pending: state.pending.len(),
            tier_filled: fills.len() - general_filled,
            general_filled,
            steps,
        },
        record: state.working,
        unfilled: state.pending,
        fills,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use hazfill_shared::{HazfillError, Result, TiersConfig};

    use super::*;
    use crate::capability::{SearchHit, SearchResponse};

    /// Answers searches from a queue; an exhausted queue means no results.
    #[derive(Default)]
    struct ScriptedSearcher {
        replies: Mutex<VecDeque<Result<Vec<SearchHit>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSearcher {
        fn new(replies: Vec<Result<Vec<SearchHit>>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            let replies = (0..16)
                .map(|_| Err(HazfillError::Network("timeout".into())))
                .collect();
            Self::new(replies)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Searcher for ScriptedSearcher {
        async fn search(&self, _query: &str, _domains: Option<&[String]>) -> Result<SearchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new())).map(SearchResponse::from)
        }
    }

    /// Answers completions from a queue; an exhausted queue returns `{}`.
    #[derive(Default)]
    struct ScriptedExtractor {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok("{}".to_string()))
        }
    }

    fn nitrogen() -> Record {
        Record::from_pairs([("chemical_name", Some("Nitrogen"))]).unwrap()
    }

    fn catalog() -> TierCatalog {
        TierCatalog::from_config(&TiersConfig::default())
    }

    fn cas_hit() -> Vec<SearchHit> {
        vec![SearchHit::new("Nitrogen CAS 7727-37-9", "https://airliquide.com/n2")]
    }

    #[tokio::test]
    async fn supplier_fill_survives_weaker_standards_answer() {
        let searcher = ScriptedSearcher::new(vec![Ok(cas_hit()), Ok(cas_hit())]);
        let extractor = ScriptedExtractor::new(vec![
            r#"{"updates": [{"field": "cas_number", "value": "7727-37-9", "confidence": 0.8}]}"#,
            r#"{"updates": [{"field": "cas_number", "value": "7727-37-0", "confidence": 0.85}]}"#,
        ]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&nitrogen()).await;

        assert_eq!(out.record.get("cas_number"), Some("7727-37-9"));
        let cas = out.fills.iter().find(|f| f.field == "cas_number").unwrap();
        assert_eq!(cas.fill.tier, "suppliers");
        assert_eq!(cas.fill.confidence, 0.8);
        assert!(!out.unfilled.contains(&"cas_number"));
        assert_eq!(out.summary.tier_filled, 1);
    }

    #[tokio::test]
    async fn general_estimate_is_flagged_for_review() {
        let searcher = ScriptedSearcher::default();
        let extractor = ScriptedExtractor::new(vec![
            r#"{"updates": [{"field": "hazard_class", "value": "Non-flammable gas", "confidence": 0.3}]}"#,
        ]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&nitrogen()).await;

        assert_eq!(
            out.record.get("hazard_class"),
            Some("Non-flammable gas (review required)")
        );
        assert_eq!(out.summary.general_filled, 1);
        assert_eq!(out.summary.tier_filled, 0);
        // tiers had no results, so only the general rounds reached the extractor
        assert_eq!(extractor.calls(), MAX_GENERAL_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn complete_record_is_untouched() {
        let pairs: Vec<_> = FIELDS.iter().map(|d| (d.name, Some("x"))).collect();
        let record = Record::from_pairs(pairs).unwrap();
        let searcher = ScriptedSearcher::default();
        let extractor = ScriptedExtractor::default();
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&record).await;

        assert_eq!(out.record, record);
        assert!(out.fills.is_empty());
        assert_eq!(out.summary, FillSummary::default());
        assert_eq!(searcher.calls(), 0);
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn failing_capabilities_still_terminate() {
        let searcher = ScriptedSearcher::failing();
        let extractor = ScriptedExtractor::new(vec![]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let record = nitrogen();
        let out = filler.fill(&record).await;

        assert_eq!(out.summary.steps, filler.max_steps());
        assert_eq!(searcher.calls(), cat.len() + MAX_GENERAL_ATTEMPTS as usize);
        assert_eq!(out.record, record);
        assert_eq!(out.unfilled, record.empty_field_names());
    }

    #[tokio::test]
    async fn without_open_web_one_fewer_tier() {
        let searcher = ScriptedSearcher::default();
        let extractor = ScriptedExtractor::default();
        let cat = catalog();
        let settings = FillConfig {
            enable_open_web_fallback: false,
            ..FillConfig::default()
        };
        let filler = Filler::new(&searcher, &extractor, &cat, settings);

        let out = filler.fill(&nitrogen()).await;
        assert_eq!(out.summary.steps, cat.len() - 1 + MAX_GENERAL_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn full_first_tier_skips_general_phase() {
        let record = nitrogen();
        let updates: Vec<String> = record
            .empty_field_names()
            .iter()
            .map(|f| format!(r#"{{"field": "{f}", "value": "v-{f}", "confidence": 0.9}}"#))
            .collect();
        let reply = format!(r#"{{"updates": [{}]}}"#, updates.join(","));
        let searcher = ScriptedSearcher::new(vec![Ok(cas_hit())]);
        let extractor = ScriptedExtractor::new(vec![&reply]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&record).await;

        assert!(out.unfilled.is_empty());
        assert_eq!(out.summary.general_filled, 0);
        assert_eq!(out.summary.steps, cat.len());
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn pending_and_filled_partition_original_gaps() {
        let record = Record::from_pairs([
            ("chemical_name", Some("Argon")),
            ("cas_number", Some("7440-37-1")),
        ])
        .unwrap();
        let searcher = ScriptedSearcher::new(vec![Ok(cas_hit()), Ok(cas_hit()), Ok(cas_hit())]);
        let extractor = ScriptedExtractor::new(vec![
            r#"{"updates": [{"field": "cas_number", "value": "000-00-0", "confidence": 1.0},
                            {"field": "appearance", "value": "Colorless", "confidence": 0.6}]}"#,
            r#"{"updates": [{"field": "appearance", "value": "Clear gas", "confidence": 0.85},
                            {"field": "boiling_point_c", "value": "-185.8", "confidence": 0.7}]}"#,
            r#"not even json"#,
            r#"{"updates": [{"field": "flash_point", "value": "N/A", "confidence": 0.9}]}"#,
        ]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&record).await;

        let tier_of = |field: &str| {
            out.fills
                .iter()
                .find(|f| f.field == field)
                .map(|f| f.fill.tier.clone())
        };
        assert_eq!(out.record.get("cas_number"), Some("7440-37-1"));
        assert_eq!(tier_of("cas_number"), None);
        // only pending fields are eligible, so a later tier cannot replace a fill
        assert_eq!(out.record.get("appearance"), Some("Colorless"));
        assert_eq!(tier_of("appearance").as_deref(), Some("suppliers"));
        assert_eq!(tier_of("boiling_point_c").as_deref(), Some("standards"));
        assert_eq!(out.record.get("flash_point"), Some("N/A (review required)"));
        assert_eq!(tier_of("flash_point").as_deref(), Some("general"));

        let filled: HashSet<_> = out.fills.iter().map(|f| f.field).collect();
        let pending: HashSet<_> = out.unfilled.iter().copied().collect();
        let original: HashSet<_> = record.empty_field_names().into_iter().collect();
        assert!(filled.is_disjoint(&pending));
        assert_eq!(&filled | &pending, original);
        assert_eq!(out.summary.filled + out.summary.pending, original.len());
    }

    #[tokio::test]
    async fn fills_reported_in_schema_order() {
        let searcher = ScriptedSearcher::new(vec![Ok(cas_hit())]);
        let extractor = ScriptedExtractor::new(vec![
            r#"{"updates": [{"field": "ph_value", "value": "7", "confidence": 0.9},
                            {"field": "cas_number", "value": "7727-37-9", "confidence": 0.9}]}"#,
        ]);
        let cat = catalog();
        let filler = Filler::new(&searcher, &extractor, &cat, FillConfig::default());

        let out = filler.fill(&nitrogen()).await;
        let order: Vec<_> = out.fills.iter().map(|f| f.field).collect();
        assert_eq!(order[..2], ["cas_number", "ph_value"]);
    }
}
