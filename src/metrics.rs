use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::PipelineWarning;

/// Counters the Parquet writer updates while draining its channel.
pub trait MetricsCollector: Send + Sync {
    fn inc_batches(&self);
    fn add_bytes_written(&self, bytes: u64);
}

/// Per-file counters for zero-contention counting in parallel workloads.
/// Fill one per file in a worker thread, then merge into global Metrics.
#[derive(Debug, Default, Clone)]
pub struct LocalMetrics {
    rows_imported: u64,
    rows_expanded: u64,
    rows_positioned: u64,
    ptm_sites: u64,
    warnings_no_entry: u64,
    warnings_unmatched: u64,
    bytes_read: u64,
}

impl LocalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rows_imported(&mut self, count: u64) {
        self.rows_imported += count;
    }

    pub fn add_rows_expanded(&mut self, count: u64) {
        self.rows_expanded += count;
    }

    pub fn add_rows_positioned(&mut self, count: u64) {
        self.rows_positioned += count;
    }

    pub fn add_ptm_sites(&mut self, count: u64) {
        self.ptm_sites += count;
    }

    pub fn add_bytes_read(&mut self, bytes: u64) {
        self.bytes_read += bytes;
    }

    pub fn record_warning(&mut self, warning: &PipelineWarning) {
        match warning {
            PipelineWarning::NoReferenceEntry { .. } => self.warnings_no_entry += 1,
            PipelineWarning::SequenceNotMatched { .. } => self.warnings_unmatched += 1,
        }
    }

    pub fn rows_imported(&self) -> u64 {
        self.rows_imported
    }

    pub fn rows_expanded(&self) -> u64 {
        self.rows_expanded
    }

    pub fn rows_positioned(&self) -> u64 {
        self.rows_positioned
    }

    pub fn ptm_sites(&self) -> u64 {
        self.ptm_sites
    }

    pub fn warnings(&self) -> u64 {
        self.warnings_no_entry + self.warnings_unmatched
    }

    /// Merge this local metrics into a global Metrics instance (one atomic op per field)
    pub fn merge_into(&self, global: &Metrics) {
        let inner = &global.inner;
        let pairs = [
            (&inner.rows_imported, self.rows_imported),
            (&inner.rows_expanded, self.rows_expanded),
            (&inner.rows_positioned, self.rows_positioned),
            (&inner.ptm_sites, self.ptm_sites),
            (&inner.warnings_no_entry, self.warnings_no_entry),
            (&inner.warnings_unmatched, self.warnings_unmatched),
            (&inner.bytes_read, self.bytes_read),
        ];
        for (counter, value) in pairs {
            if value > 0 {
                counter.fetch_add(value, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,
    files_processed: AtomicU64,
    files_failed: AtomicU64,
    rows_imported: AtomicU64,
    rows_expanded: AtomicU64,
    rows_positioned: AtomicU64,
    ptm_sites: AtomicU64,
    warnings_no_entry: AtomicU64,
    warnings_unmatched: AtomicU64,
    batches_written: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                files_processed: AtomicU64::new(0),
                files_failed: AtomicU64::new(0),
                rows_imported: AtomicU64::new(0),
                rows_expanded: AtomicU64::new(0),
                rows_positioned: AtomicU64::new(0),
                ptm_sites: AtomicU64::new(0),
                warnings_no_entry: AtomicU64::new(0),
                warnings_unmatched: AtomicU64::new(0),
                batches_written: AtomicU64::new(0),
                bytes_read: AtomicU64::new(0),
                bytes_written: AtomicU64::new(0),
            }),
        }
    }

    pub fn inc_files_processed(&self) {
        self.inner.files_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_files_failed(&self) {
        self.inner.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files_processed(&self) -> u64 {
        self.inner.files_processed.load(Ordering::Relaxed)
    }

    pub fn files_failed(&self) -> u64 {
        self.inner.files_failed.load(Ordering::Relaxed)
    }

    pub fn rows_imported(&self) -> u64 {
        self.inner.rows_imported.load(Ordering::Relaxed)
    }

    pub fn rows_expanded(&self) -> u64 {
        self.inner.rows_expanded.load(Ordering::Relaxed)
    }

    pub fn rows_positioned(&self) -> u64 {
        self.inner.rows_positioned.load(Ordering::Relaxed)
    }

    pub fn ptm_sites(&self) -> u64 {
        self.inner.ptm_sites.load(Ordering::Relaxed)
    }

    pub fn warnings_no_entry(&self) -> u64 {
        self.inner.warnings_no_entry.load(Ordering::Relaxed)
    }

    pub fn warnings_unmatched(&self) -> u64 {
        self.inner.warnings_unmatched.load(Ordering::Relaxed)
    }

    pub fn batches(&self) -> u64 {
        self.inner.batches_written.load(Ordering::Relaxed)
    }

    pub fn bytes_read(&self) -> u64 {
        self.inner.bytes_read.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> u64 {
        self.inner.bytes_written.load(Ordering::Relaxed)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.inner.start_time.elapsed().as_secs_f64()
    }

    pub fn print_summary(&self) {
        let elapsed = self.elapsed_secs();
        let rows = self.rows_imported();
        let rows_per_sec = rows as f64 / elapsed.max(f64::EPSILON);
        let mb_read = self.bytes_read() as f64 / (1024.0 * 1024.0);
        let mb_written = self.bytes_written() as f64 / (1024.0 * 1024.0);

        log::info!("=== Mapping Summary ===");
        log::info!("Files processed:   {}", self.files_processed());
        log::info!("Files failed:      {}", self.files_failed());
        log::info!("Rows imported:     {rows}");
        log::info!("Rows expanded:     {}", self.rows_expanded());
        log::info!("Rows positioned:   {}", self.rows_positioned());
        log::info!("PTM sites:         {}", self.ptm_sites());
        log::info!("Warnings:");
        log::info!("  - no_entry:      {}", self.warnings_no_entry());
        log::info!("  - unmatched:     {}", self.warnings_unmatched());
        log::info!("Batches written:   {}", self.batches());
        log::info!("Time elapsed:      {elapsed:.2}s");
        log::info!("Throughput:        {rows_per_sec:.0} rows/sec");
        log::info!("Bytes read:        {mb_read:.2} MB");
        log::info!("Bytes written:     {mb_written:.2} MB");
    }
}

impl MetricsCollector for Metrics {
    fn inc_batches(&self) {
        self.inner.batches_written.fetch_add(1, Ordering::Relaxed);
    }

    fn add_bytes_written(&self, bytes: u64) {
        self.inner.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_metrics_merge_into_global() {
        let global = Metrics::new();
        let mut local = LocalMetrics::new();
        local.add_rows_imported(6);
        local.add_rows_expanded(8);
        local.add_rows_positioned(6);
        local.record_warning(&PipelineWarning::NoReferenceEntry {
            accession: "Nonsense".into(),
        });
        local.record_warning(&PipelineWarning::SequenceNotMatched {
            sequence: "NONSEQ".into(),
            accession: "A0A087WTH1".into(),
        });

        local.merge_into(&global);
        local.merge_into(&global);

        assert_eq!(global.rows_imported(), 12);
        assert_eq!(global.rows_expanded(), 16);
        assert_eq!(global.warnings_no_entry(), 2);
        assert_eq!(global.warnings_unmatched(), 2);
        assert_eq!(local.warnings(), 2);
    }
}
