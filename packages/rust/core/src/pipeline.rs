//! Batch pipeline: table → fill each record → table + provenance report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use hazfill_shared::{HazfillError, Record, Result};
use hazfill_tabular::{LoadOptions, load_records, write_records};

use crate::run::{FieldFill, FillSummary, Filler};

const PROVENANCE_SUFFIX: &str = ".provenance.json";

/// Configuration for [`run_batch`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Table to read.
    pub input: PathBuf,
    /// Where to write the filled table. `None` keeps results in memory.
    pub output: Option<PathBuf>,
    /// Process only the first N records.
    pub max_rows: Option<usize>,
    /// Skip search and extraction entirely.
    pub load_only: bool,
}

/// Per-row provenance.
#[derive(Debug, Clone, Serialize)]
pub struct RowReport {
    /// 1-based data row (header excluded).
    pub row: usize,
    pub chemical: String,
    pub summary: FillSummary,
    pub fills: Vec<FieldFill>,
    pub unfilled: Vec<&'static str>,
}

/// Result of [`run_batch`].
#[derive(Debug)]
pub struct BatchResult {
    pub run_id: Uuid,
    /// Records in input order, filled unless `load_only`.
    pub records: Vec<Record>,
    pub rows: Vec<RowReport>,
    /// Written table, if any.
    pub output: Option<PathBuf>,
    /// Written provenance report, if any.
    pub provenance: Option<PathBuf>,
    pub elapsed: std::time::Duration,
}

impl BatchResult {
    pub fn total_filled(&self) -> usize {
        self.rows.iter().map(|r| r.summary.filled).sum()
    }

    pub fn total_pending(&self) -> usize {
        self.rows.iter().map(|r| r.summary.pending).sum()
    }
}

/// Progress callback for batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a record is filled.
    fn record_started(&self, current: usize, total: usize, chemical: &str);
    /// Called after a record is filled.
    fn record_done(&self, current: usize, total: usize, summary: &FillSummary);
    /// Called when the batch completes.
    fn done(&self, result: &BatchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_started(&self, _current: usize, _total: usize, _chemical: &str) {}
    fn record_done(&self, _current: usize, _total: usize, _summary: &FillSummary) {}
    fn done(&self, _result: &BatchResult) {}
}

#[derive(Serialize)]
struct ProvenanceReport<'a> {
    run_id: Uuid,
    completed_at: DateTime<Utc>,
    input: &'a Path,
    output: &'a Path,
    load_only: bool,
    total_filled: usize,
    total_pending: usize,
    rows: &'a [RowReport],
}

/// Run the batch.
///
/// Records are filled strictly one after another. `filler` may be `None`
/// only in load-only mode.
#[instrument(skip_all, fields(input = %config.input.display(), load_only = config.load_only))]
pub async fn run_batch(
    config: &BatchConfig,
    filler: Option<&Filler<'_>>,
    progress: &dyn ProgressReporter,
) -> Result<BatchResult> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    info!(%run_id, "starting batch");

    progress.phase("Loading table");
    let mut records = load_records(&config.input, &LoadOptions::default())?;
    if let Some(max) = config.max_rows {
        records.truncate(max);
    }
    let total = records.len();
    info!(records = total, "table loaded");

    let mut rows = Vec::with_capacity(total);
    let records = if config.load_only {
        records
    } else {
        let filler = filler.ok_or_else(|| {
            HazfillError::validation("search and extraction backends are required unless load-only")
        })?;
        progress.phase("Filling records");
        let mut filled = Vec::with_capacity(total);
        for (i, record) in records.iter().enumerate() {
            let chemical = record.identifying_name().to_string();
            progress.record_started(i + 1, total, &chemical);
            let outcome = filler.fill(record).await;
            progress.record_done(i + 1, total, &outcome.summary);
            rows.push(RowReport {
                row: i + 1,
                chemical,
                summary: outcome.summary,
                fills: outcome.fills,
                unfilled: outcome.unfilled,
            });
            filled.push(outcome.record);
        }
        filled
    };

    let mut result = BatchResult {
        run_id,
        records,
        rows,
        output: None,
        provenance: None,
        elapsed: start.elapsed(),
    };

    if let Some(output) = &config.output {
        progress.phase("Writing table");
        write_records(&result.records, output, &config.input)?;
        let report_path = provenance_path(output);
        write_provenance(&result, config, output, &report_path)?;
        result.output = Some(output.clone());
        result.provenance = Some(report_path);
    }
    result.elapsed = start.elapsed();

    progress.done(&result);
    info!(
        %run_id,
        records = result.records.len(),
        filled = result.total_filled(),
        pending = result.total_pending(),
        elapsed_ms = result.elapsed.as_millis(),
        "batch complete"
    );
    Ok(result)
}

/// `<output>.provenance.json` next to the written table.
pub fn provenance_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(PROVENANCE_SUFFIX);
    PathBuf::from(name)
}

fn write_provenance(
    result: &BatchResult,
    config: &BatchConfig,
    output: &Path,
    path: &Path,
) -> Result<()> {
    let report = ProvenanceReport {
        run_id: result.run_id,
        completed_at: Utc::now(),
        input: &config.input,
        output,
        load_only: config.load_only,
        total_filled: result.total_filled(),
        total_pending: result.total_pending(),
        rows: &result.rows,
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| HazfillError::parse(format!("provenance report: {e}")))?;
    std::fs::write(path, json).map_err(|e| HazfillError::io(path, e))?;
    info!(path = %path.display(), "provenance written");
    Ok(())
}
