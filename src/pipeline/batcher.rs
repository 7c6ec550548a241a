use arrow::record_batch::RecordBatch;
use crossbeam_channel::Sender;

use crate::error::{PipelineError, Result};
use crate::metrics::{Metrics, MetricsCollector};
use crate::pipeline::annotate::ModifiedRecord;
use crate::pipeline::builders::PeptideBuilders;

pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Manages batching of annotated rows into RecordBatches and sending to the writer.
pub struct Batcher {
    builders: PeptideBuilders,
    batch_size: usize,
    sender: Sender<RecordBatch>,
    metrics: Metrics,
    source_file: Option<String>,
}

impl Batcher {
    pub fn new(sender: Sender<RecordBatch>, metrics: Metrics) -> Self {
        Self::with_batch_size(sender, metrics, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(sender: Sender<RecordBatch>, metrics: Metrics, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            builders: PeptideBuilders::new(batch_size),
            batch_size,
            sender,
            metrics,
            source_file: None,
        }
    }

    /// Tags every following row with the file it came from.
    pub fn with_source_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Adds an annotated row to the current batch. Flushes if batch is full.
    pub fn add_record(&mut self, record: &ModifiedRecord) -> Result<()> {
        self.builders
            .append_record(record, self.source_file.as_deref());

        if self.builders.len() >= self.batch_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Flushes the current batch to the channel
    pub fn flush(&mut self) -> Result<()> {
        if self.builders.is_empty() {
            return Ok(());
        }

        let batch = self.builders.finish_batch()?;
        self.sender
            .send(batch)
            .map_err(|_| PipelineError::ChannelSend)?;
        self.metrics.inc_batches();

        Ok(())
    }

    /// Finishes batching, flushing any remaining rows
    pub fn finish(mut self) -> Result<()> {
        self.flush()
    }

    /// Sends every record, then the remainder. The sender is dropped on return,
    /// whether or not a record failed.
    pub fn send_all<'a>(mut self, records: impl IntoIterator<Item = &'a ModifiedRecord>) -> Result<()> {
        for record in records {
            self.add_record(record)?;
        }
        self.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, TryRecvError};

    fn record(start: usize) -> ModifiedRecord {
        ModifiedRecord {
            unique_protein_id: "P1".into(),
            all_protein_ids: "P1".into(),
            modified_sequence: "PEPK".into(),
            naked_sequence: "PEPK".into(),
            start,
            end: start + 3,
            ptm_sites: Vec::new(),
            ptm_types: Vec::new(),
        }
    }

    #[test]
    fn flushes_full_batches_and_remainder() {
        let (tx, rx) = bounded(8);
        let metrics = Metrics::new();
        let mut batcher = Batcher::with_batch_size(tx, metrics.clone(), 2).with_source_file("a.tsv");
        for start in 1..=5 {
            batcher.add_record(&record(start)).unwrap();
        }
        batcher.finish().unwrap();

        let sizes: Vec<usize> = rx.iter().map(|b| b.num_rows()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(metrics.batches(), 3);
    }

    #[test]
    fn send_all_closes_the_channel() {
        let (tx, rx) = bounded(8);
        let records: Vec<ModifiedRecord> = (1..=3).map(record).collect();
        Batcher::with_batch_size(tx, Metrics::new(), 2)
            .send_all(&records)
            .unwrap();

        assert_eq!(rx.recv().unwrap().num_rows(), 2);
        assert_eq!(rx.recv().unwrap().num_rows(), 1);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected)));
    }

    #[test]
    fn send_all_stops_at_the_first_failed_send() {
        let (tx, rx) = bounded(1);
        drop(rx);

        let metrics = Metrics::new();
        let records: Vec<ModifiedRecord> = (1..=3).map(record).collect();
        let err = Batcher::with_batch_size(tx, metrics.clone(), 1)
            .send_all(&records)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ChannelSend));
        assert_eq!(metrics.batches(), 0);
    }
}
