use arrow::array::{ArrayBuilder, ArrayRef, Int32Builder, ListBuilder, StringBuilder};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

use crate::error::Result;
use crate::pipeline::annotate::ModifiedRecord;
use crate::schema::schema_ref;

/// Builders for constructing Arrow arrays from annotated peptide rows.
pub struct PeptideBuilders {
    pub unique_protein_id: StringBuilder,
    pub all_protein_ids: StringBuilder,
    pub modified_sequence: StringBuilder,
    pub naked_sequence: StringBuilder,
    pub start: Int32Builder,
    pub end: Int32Builder,
    pub ptm_sites: ListBuilder<Int32Builder>,
    pub ptm_types: ListBuilder<StringBuilder>,
    pub source_file: StringBuilder,
    capacity: usize,
}

impl PeptideBuilders {
    pub fn new(capacity: usize) -> Self {
        Self {
            unique_protein_id: StringBuilder::with_capacity(capacity, capacity * 10),
            all_protein_ids: StringBuilder::with_capacity(capacity, capacity * 24),
            modified_sequence: StringBuilder::with_capacity(capacity, capacity * 40),
            naked_sequence: StringBuilder::with_capacity(capacity, capacity * 20),
            start: Int32Builder::with_capacity(capacity),
            end: Int32Builder::with_capacity(capacity),
            ptm_sites: ListBuilder::new(Int32Builder::with_capacity(capacity)),
            ptm_types: ListBuilder::new(StringBuilder::with_capacity(capacity, capacity * 16)),
            source_file: StringBuilder::with_capacity(capacity, capacity * 32),
            capacity,
        }
    }

    /// Appends one annotated row.
    pub fn append_record(&mut self, record: &ModifiedRecord, source_file: Option<&str>) {
        self.unique_protein_id.append_value(&record.unique_protein_id);
        self.all_protein_ids.append_value(&record.all_protein_ids);
        self.modified_sequence.append_value(&record.modified_sequence);
        self.naked_sequence.append_value(&record.naked_sequence);
        self.start.append_value(to_i32(record.start));
        self.end.append_value(to_i32(record.end));

        for site in &record.ptm_sites {
            self.ptm_sites.values().append_value(to_i32(*site));
        }
        self.ptm_sites.append(true);

        for label in &record.ptm_types {
            self.ptm_types.values().append_value(label);
        }
        self.ptm_types.append(true);

        self.source_file.append_option(source_file);
    }

    /// Finishes the current batch and returns a RecordBatch
    pub fn finish_batch(&mut self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = vec![
            Arc::new(self.unique_protein_id.finish()),
            Arc::new(self.all_protein_ids.finish()),
            Arc::new(self.modified_sequence.finish()),
            Arc::new(self.naked_sequence.finish()),
            Arc::new(self.start.finish()),
            Arc::new(self.end.finish()),
            Arc::new(self.ptm_sites.finish()),
            Arc::new(self.ptm_types.finish()),
            Arc::new(self.source_file.finish()),
        ];

        let batch = RecordBatch::try_new(schema_ref(), arrays)?;

        // Reset builders for next batch
        *self = Self::new(self.capacity);

        Ok(batch)
    }

    /// Returns the current number of rows in the builders
    pub fn len(&self) -> usize {
        self.unique_protein_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Int32Array, ListArray, StringArray};

    fn record(sites: Vec<usize>, types: Vec<&str>) -> ModifiedRecord {
        ModifiedRecord {
            unique_protein_id: "A0A024R161".into(),
            all_protein_ids: "A0A024R161;A0A087WT10".into(),
            modified_sequence: "PEPT[Phospho (STY)]IDER".into(),
            naked_sequence: "PEPTIDER".into(),
            start: 3,
            end: 10,
            ptm_sites: sites,
            ptm_types: types.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn builds_a_batch_with_list_columns() {
        let mut builders = PeptideBuilders::new(4);
        assert!(builders.is_empty());
        builders.append_record(&record(vec![3], vec!["[Phospho (STY)]"]), Some("run.tsv"));
        builders.append_record(&record(vec![], vec![]), None);
        assert_eq!(builders.len(), 2);

        let batch = builders.finish_batch().unwrap();
        assert!(builders.is_empty());
        assert_eq!(batch.num_rows(), 2);

        let starts = batch.column(4).as_any().downcast_ref::<Int32Array>().unwrap();
        assert_eq!(starts.value(0), 3);

        let sites = batch.column(6).as_any().downcast_ref::<ListArray>().unwrap();
        assert_eq!(sites.value_length(0), 1);
        assert_eq!(sites.value_length(1), 0);

        let files = batch.column(8).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(files.value(0), "run.tsv");
        assert!(files.is_null(1));
    }
}
