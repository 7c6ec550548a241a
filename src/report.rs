//! Run report generation and YAML serialization.
//!
//! Captures the effective inputs, per-file outcomes and aggregate counters of
//! one invocation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::Metrics;
use crate::runs::RunContext;

/// Status of a run or of a single file.
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "status")]
pub enum RunStatus {
    Success,
    Error { message: String },
}

/// Outcome of one result file.
#[derive(Serialize, Clone, Debug)]
pub struct FileSummary {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub rows_imported: u64,
    pub rows_positioned: u64,
    pub warnings: u64,
    #[serde(flatten)]
    pub status: RunStatus,
}

/// Complete report for a single run.
#[derive(Serialize, Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    #[serde(flatten)]
    pub status: RunStatus,

    pub organism: String,
    pub samples: Vec<String>,
    pub totals: TotalsReport,
    pub files: Vec<FileSummary>,
}

/// Aggregate counters across all files.
#[derive(Serialize, Clone, Debug)]
pub struct TotalsReport {
    pub files_processed: u64,
    pub files_failed: u64,
    pub rows_imported: u64,
    pub rows_per_sec: f64,
    pub rows_expanded: u64,
    pub rows_positioned: u64,
    pub ptm_sites: u64,
    pub warnings_no_entry: u64,
    pub warnings_unmatched: u64,
    pub batches_written: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl TotalsReport {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let elapsed = metrics.elapsed_secs();
        let rows = metrics.rows_imported();
        let rows_per_sec = if elapsed > 0.0 {
            rows as f64 / elapsed
        } else {
            0.0
        };

        Self {
            files_processed: metrics.files_processed(),
            files_failed: metrics.files_failed(),
            rows_imported: rows,
            rows_per_sec,
            rows_expanded: metrics.rows_expanded(),
            rows_positioned: metrics.rows_positioned(),
            ptm_sites: metrics.ptm_sites(),
            warnings_no_entry: metrics.warnings_no_entry(),
            warnings_unmatched: metrics.warnings_unmatched(),
            batches_written: metrics.batches(),
            bytes_read: metrics.bytes_read(),
            bytes_written: metrics.bytes_written(),
        }
    }
}

impl RunReport {
    /// Generate a complete run report.
    pub fn generate(
        run_context: &RunContext,
        metrics: &Metrics,
        organism: &str,
        samples: &[String],
        files: Vec<FileSummary>,
        status: RunStatus,
    ) -> Self {
        Self {
            run_id: run_context.run_id.clone(),
            timestamp: run_context.start_time,
            duration_secs: metrics.elapsed_secs(),
            status,
            organism: organism.to_string(),
            samples: samples.to_vec(),
            totals: TotalsReport::from_metrics(metrics),
            files,
        }
    }

    /// Save the report as YAML to the specified path.
    pub fn save_yaml(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize report to YAML")?;

        fs::write(path, yaml)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;

        Ok(())
    }
}
