//! Delimited-text table source and sink for HMIS records.
//!
//! Column position maps to field name through the shared schema. The first
//! row is a header. Writing starts from the original file so headers,
//! columns outside the schema, and unprocessed rows survive untouched.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info, instrument};

use hazfill_shared::schema::{self, FIELDS};
use hazfill_shared::{HazfillError, Record, Result};

/// Options for [`load_records`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Treat the first row as a header and skip it.
    pub skip_header: bool,
    /// Field delimiter; inferred from the file extension when `None`.
    pub delimiter: Option<u8>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            skip_header: true,
            delimiter: None,
        }
    }
}

/// `.tsv` / `.tab` files are tab separated, everything else is comma separated.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    }
}

/// Load every data row of the table at `path` as a [`Record`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_records(path: &Path, opts: &LoadOptions) -> Result<Vec<Record>> {
    let delimiter = opts.delimiter.unwrap_or_else(|| delimiter_for(path));
    let rows = read_rows(path, delimiter)?;
    let skip = usize::from(opts.skip_header && !rows.is_empty());

    let records = rows
        .iter()
        .skip(skip)
        .map(row_to_record)
        .collect::<Result<Vec<_>>>()?;

    info!(rows = records.len(), "table loaded");
    Ok(records)
}

/// Write `records` into a copy of `original`, saved at `output`.
///
/// Record `i` lands on data row `i` (the row after the header). Only schema
/// columns are overwritten; absent values become blank cells.
#[instrument(skip_all, fields(records = records.len(), output = %output.display()))]
pub fn write_records(records: &[Record], output: &Path, original: &Path) -> Result<()> {
    let mut rows = read_rows(original, delimiter_for(original))?;
    if rows.is_empty() {
        rows.push(header_row());
    }

    for (i, record) in records.iter().enumerate() {
        let row_idx = i + 1;
        if row_idx >= rows.len() {
            rows.push(StringRecord::new());
        }
        rows[row_idx] = merge_row(&rows[row_idx], record);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HazfillError::io(parent, e))?;
    }

    let file = File::create(output).map_err(|e| HazfillError::io(output, e))?;
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter_for(output))
        .flexible(true)
        .from_writer(file);

    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| HazfillError::Table(format!("{}: {e}", output.display())))?;
    }
    writer.flush().map_err(|e| HazfillError::io(output, e))?;

    debug!(rows = rows.len(), "table written");
    Ok(())
}

fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<StringRecord>> {
    let file = File::open(path).map_err(|e| HazfillError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(file);

    reader
        .records()
        .map(|r| r.map_err(|e| HazfillError::Table(format!("{}: {e}", path.display()))))
        .collect()
}

fn row_to_record(row: &StringRecord) -> Result<Record> {
    let mut record = Record::new();
    for (column, cell) in row.iter().enumerate() {
        if let Some(field) = schema::field_at_column(column) {
            record.set(field.name, Some(cell))?;
        }
    }
    Ok(record)
}

/// Overlay the record's schema columns onto an existing row.
fn merge_row(existing: &StringRecord, record: &Record) -> StringRecord {
    let width = existing.len().max(schema::max_column() + 1);
    let mut cells: Vec<String> = (0..width)
        .map(|i| existing.get(i).unwrap_or_default().to_string())
        .collect();

    for field in FIELDS {
        cells[field.column] = record.get(field.name).unwrap_or_default().to_string();
    }
    StringRecord::from(cells)
}

fn header_row() -> StringRecord {
    FIELDS.iter().map(|f| f.name).collect()
}
