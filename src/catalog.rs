//! Table catalog: loaded survey tables plus generated metadata.
//!
//! The catalog is built once at startup and read-only afterwards. A single
//! map holds both the table data and its metadata, so the two can never
//! drift out of sync. The formatted metadata it produces is deterministic:
//! the same catalog always yields the same prompt fragment.

use crate::error::{AssistantError, Result};
use itertools::Itertools;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Cap on distinct string values included per column summary.
const MAX_SAMPLE_VALUES: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub row_count: usize,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone)]
pub struct TableEntry {
    pub frame: DataFrame,
    pub metadata: TableMetadata,
}

/// Read-only mapping of table identifier to data and metadata.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    entries: BTreeMap<String, TableEntry>,
}

impl TableCatalog {
    /// Build a catalog from already-loaded frames, generating metadata for
    /// each one.
    pub fn from_frames(frames: BTreeMap<String, DataFrame>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (name, frame) in frames {
            let metadata = summarize(&frame)?;
            entries.insert(name, TableEntry { frame, metadata });
        }
        Ok(Self { entries })
    }

    /// Load every `*.csv` file in a directory as one table keyed by file stem.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut frames = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let frame = LazyCsvReader::new(&path)
                .with_try_parse_dates(true)
                .with_infer_schema_length(Some(1000))
                .finish()?
                .collect()?;
            info!("Loaded table '{}' ({} rows)", stem, frame.height());
            frames.insert(stem.to_string(), frame);
        }
        if frames.is_empty() {
            return Err(AssistantError::Catalog(format!(
                "no CSV tables found in {}",
                dir.display()
            )));
        }
        Self::from_frames(frames)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn table_ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn frame(&self, id: &str) -> Option<&DataFrame> {
        self.entries.get(id).map(|e| &e.frame)
    }

    pub fn metadata(&self, id: &str) -> Option<&TableMetadata> {
        self.entries.get(id).map(|e| &e.metadata)
    }

    /// Format the whole catalog for the table-selection prompt. Tables appear
    /// in key order, columns in frame order.
    pub fn format_all(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| format_table(name, &entry.metadata))
            .join("\n")
    }

    /// Format a single table for the codegen prompt, which must never see
    /// metadata for any other table.
    pub fn format_one(&self, id: &str) -> Option<String> {
        self.entries
            .get(id)
            .map(|entry| format_table(id, &entry.metadata))
    }
}

fn format_table(name: &str, metadata: &TableMetadata) -> String {
    let mut out = format!("=== Table: {} ({} rows) ===\n", name, metadata.row_count);
    for col in &metadata.columns {
        out.push_str(&format!("  - {} ({}): {}\n", col.name, col.dtype, col.detail));
    }
    out
}

fn summarize(frame: &DataFrame) -> Result<TableMetadata> {
    let mut columns = Vec::new();
    for series in frame.get_columns() {
        let dtype = series.dtype().clone();
        let detail = if dtype.is_numeric() {
            numeric_range(series)?
        } else if dtype == DataType::String {
            sample_values(series)?
        } else {
            "no summary".to_string()
        };
        columns.push(ColumnSummary {
            name: series.name().to_string(),
            dtype: dtype.to_string(),
            detail,
        });
    }
    Ok(TableMetadata {
        row_count: frame.height(),
        columns,
    })
}

fn numeric_range(series: &Series) -> Result<String> {
    let casted = series.cast(&DataType::Float64)?;
    let values = casted.f64()?;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut seen = false;
    for v in values.into_iter().flatten() {
        seen = true;
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if seen {
        Ok(format!("range {} to {}", min, max))
    } else {
        Ok("all null".to_string())
    }
}

fn sample_values(series: &Series) -> Result<String> {
    let values = series.str()?;
    // First N distinct values in row order, so the output is stable.
    let mut sample: Vec<String> = Vec::new();
    for v in values.into_iter().flatten() {
        if !sample.iter().any(|s| s == v) {
            sample.push(v.to_string());
            if sample.len() == MAX_SAMPLE_VALUES {
                break;
            }
        }
    }
    if sample.is_empty() {
        Ok("all null".to_string())
    } else {
        Ok(format!("values: {}", sample.iter().join(", ")))
    }
}
