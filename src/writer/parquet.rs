use arrow::record_batch::RecordBatch;
use crossbeam_channel::Receiver;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, Encoding, ZstdLevel};
use parquet::file::properties::{WriterProperties, WriterVersion};
use std::fs::File;
use std::path::Path;

use crate::config::Settings;
use crate::metrics::MetricsCollector;
use crate::schema::schema_ref;
use anyhow::{anyhow, Context, Result};

/// Consumes RecordBatches from the channel and writes them to a Parquet file.
/// Returns the number of rows written.
pub fn write_batches<M: MetricsCollector>(
    rx: Receiver<RecordBatch>,
    output: &Path,
    metrics: &M,
    settings: &Settings,
) -> Result<u64> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let file = File::create(output)
        .with_context(|| format!("Failed to create Parquet file {}", output.display()))?;
    let props = writer_properties(settings)?;
    let mut writer = ArrowWriter::try_new(file, schema_ref(), Some(props))?;

    let mut rows = 0u64;
    for batch in rx {
        let batch_bytes = batch.get_array_memory_size() as u64;
        rows += batch.num_rows() as u64;
        writer.write(&batch)?;
        metrics.add_bytes_written(batch_bytes);
    }

    let file_metadata = writer.close()?;
    let total_bytes: i64 = file_metadata
        .row_groups
        .iter()
        .map(|rg| rg.total_byte_size)
        .sum();
    log::info!(
        "Wrote Parquet: {} ({} rows, {:.2} MB)",
        output.display(),
        rows,
        total_bytes as f64 / (1024.0 * 1024.0)
    );

    Ok(rows)
}

/// Creates WriterProperties for peptide tables from Settings.
fn writer_properties(settings: &Settings) -> Result<WriterProperties> {
    let zstd_level = ZstdLevel::try_new(settings.performance.zstd_level as i32)
        .map_err(|e| anyhow!("Invalid zstd_level: {}", e))?;

    Ok(WriterProperties::builder()
        .set_writer_version(WriterVersion::PARQUET_2_0)
        .set_compression(Compression::ZSTD(zstd_level))
        // Sequences are mostly unique; accessions and file names repeat
        .set_dictionary_enabled(true)
        .set_column_dictionary_enabled("modified_sequence".into(), false)
        .set_column_encoding("modified_sequence".into(), Encoding::PLAIN)
        .set_max_row_group_size(settings.performance.max_row_group_size)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::pipeline::annotate::ModifiedRecord;
    use crate::pipeline::batcher::Batcher;
    use crossbeam_channel::bounded;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    #[test]
    fn writes_batches_to_parquet() {
        let output = std::env::temp_dir().join("pepmap_writer_test.parquet");
        let settings = Settings::default();
        let metrics = Metrics::new();
        let (tx, rx) = bounded(4);

        let mut batcher = Batcher::with_batch_size(tx, metrics.clone(), 2);
        for start in [3usize, 28, 107] {
            batcher
                .add_record(&ModifiedRecord {
                    unique_protein_id: "A0A024R161".into(),
                    all_protein_ids: "A0A024R161".into(),
                    modified_sequence: "PEPT[Phospho (STY)]IDER".into(),
                    naked_sequence: "PEPTIDER".into(),
                    start,
                    end: start + 7,
                    ptm_sites: vec![3],
                    ptm_types: vec!["[Phospho (STY)]".into()],
                })
                .unwrap();
        }
        batcher.finish().unwrap();

        let rows = write_batches(rx, &output, &metrics, &settings).unwrap();
        assert_eq!(rows, 3);
        assert!(metrics.bytes_written() > 0);

        let reader = SerializedFileReader::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 3);

        let _ = std::fs::remove_file(output);
    }
}
