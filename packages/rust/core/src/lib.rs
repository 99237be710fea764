//! Core fill logic for hazfill.
//!
//! A record is driven through a forward-only state machine: one search and
//! extraction round per trusted tier, then up to three lenient general
//! rounds. Steps return patches against an immutable [`state::RunState`];
//! the [`run::Filler`] applies them and asks the [`router`] where to go next.

pub mod capability;
pub mod merge;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod router;
pub mod run;
pub mod state;
pub mod step;
pub mod tiers;

pub use capability::{Extractor, SearchHit, SearchResponse, Searcher};
pub use pipeline::{BatchConfig, BatchResult, ProgressReporter, RowReport, SilentProgress, run_batch};
pub use run::{FieldFill, FillOutcome, FillSummary, Filler};
pub use state::{FillRecord, Route, RunState, StatePatch};
pub use tiers::{Tier, TierCatalog};
