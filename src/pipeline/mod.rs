//! Import → Expand → Resolve → Annotate, plus Arrow batching of the result.

pub mod annotate;
pub mod batcher;
pub mod builders;
pub mod expand;
pub mod position;

use regex::Regex;
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::fasta::SequenceDatabase;
use crate::import::{detect_format, import_buffered, RawRecord, SampleFilter, SourceFormat};
use crate::metrics::LocalMetrics;
use crate::reader::DEFAULT_BUFFER_SIZE;
use crate::reference::ReferenceContext;

pub use annotate::{annotate, overlapping_features, FeatureOverlap, ModifiedRecord};
pub use expand::{expand, ExpandedRecord};
pub use position::{locate, resolve, PositionedRecord};

/// A dropped row that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    NoReferenceEntry { accession: String },
    SequenceNotMatched { sequence: String, accession: String },
}

impl PipelineWarning {
    pub fn accession(&self) -> &str {
        match self {
            PipelineWarning::NoReferenceEntry { accession }
            | PipelineWarning::SequenceNotMatched { accession, .. } => accession,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PipelineWarning::NoReferenceEntry { .. } => "no_reference_entry",
            PipelineWarning::SequenceNotMatched { .. } => "sequence_not_matched",
        }
    }
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::NoReferenceEntry { accession } => {
                write!(f, "No matching entry for {accession}")
            }
            PipelineWarning::SequenceNotMatched { sequence, .. } => {
                write!(f, "Peptide sequence {sequence} could not be matched")
            }
        }
    }
}

/// A result together with the ordered list of non-fatal issues met producing it.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct WithWarnings<T> {
    pub value: T,
    pub warnings: Vec<PipelineWarning>,
}

impl<T> WithWarnings<T> {
    pub fn new(value: T, warnings: Vec<PipelineWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn clean(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithWarnings<U> {
        WithWarnings::new(f(self.value), self.warnings)
    }

    /// Runs a further stage, appending its warnings after the current ones.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> WithWarnings<U>) -> WithWarnings<U> {
        let mut warnings = self.warnings;
        let next = f(self.value);
        warnings.extend(next.warnings);
        WithWarnings::new(next.value, warnings)
    }

    pub fn into_parts(self) -> (T, Vec<PipelineWarning>) {
        (self.value, self.warnings)
    }
}

/// Expands, positions and annotates imported records.
pub fn format_input_data(
    records: &[RawRecord],
    sequences: &SequenceDatabase,
    tag_pattern: &Regex,
) -> WithWarnings<Vec<ModifiedRecord>> {
    let expanded = expand(records);
    resolve(expanded, sequences).map(|positioned| annotate(positioned, tag_pattern))
}

/// Runs the full pipeline for one result file, recording stage counts.
pub fn process_file(
    path: &Path,
    sample: impl Into<SampleFilter>,
    context: &ReferenceContext,
    tag_pattern: &Regex,
    metrics: &mut LocalMetrics,
) -> Result<WithWarnings<Vec<ModifiedRecord>>> {
    let format = detect_format(path)?;
    process_file_as(
        format,
        path,
        sample,
        context,
        tag_pattern,
        DEFAULT_BUFFER_SIZE,
        metrics,
    )
}

/// [`process_file`] for a file whose format is already known, read through a
/// buffer of `buffer_size` bytes.
pub fn process_file_as(
    format: SourceFormat,
    path: &Path,
    sample: impl Into<SampleFilter>,
    context: &ReferenceContext,
    tag_pattern: &Regex,
    buffer_size: usize,
    metrics: &mut LocalMetrics,
) -> Result<WithWarnings<Vec<ModifiedRecord>>> {
    let records = import_buffered(format, path, sample, buffer_size)?;
    metrics.add_rows_imported(records.len() as u64);

    let expanded = expand(&records);
    metrics.add_rows_expanded(expanded.len() as u64);

    let result = resolve(expanded, &context.sequences)
        .map(|positioned| annotate(positioned, tag_pattern));

    metrics.add_rows_positioned(result.value.len() as u64);
    metrics.add_ptm_sites(result.value.iter().map(|r| r.ptm_sites.len() as u64).sum());
    for warning in &result.warnings {
        metrics.record_warning(warning);
    }

    log::info!(
        "{}: {} records, {} positioned rows, {} warnings",
        path.display(),
        records.len(),
        result.value.len(),
        result.warnings.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::default_tag_pattern;

    #[test]
    fn warning_messages() {
        let missing = PipelineWarning::NoReferenceEntry {
            accession: "Nonsense".into(),
        };
        let unmatched = PipelineWarning::SequenceNotMatched {
            sequence: "NONSEQ".into(),
            accession: "A0A024R161".into(),
        };
        assert_eq!(missing.to_string(), "No matching entry for Nonsense");
        assert_eq!(unmatched.to_string(), "Peptide sequence NONSEQ could not be matched");
        assert_eq!(unmatched.accession(), "A0A024R161");
    }

    #[test]
    fn and_then_keeps_warning_order() {
        let first = WithWarnings::new(
            1,
            vec![PipelineWarning::NoReferenceEntry { accession: "A".into() }],
        );
        let chained = first.and_then(|v| {
            WithWarnings::new(
                v + 1,
                vec![PipelineWarning::NoReferenceEntry { accession: "B".into() }],
            )
        });
        assert_eq!(chained.value, 2);
        let accessions: Vec<&str> = chained.warnings.iter().map(|w| w.accession()).collect();
        assert_eq!(accessions, vec!["A", "B"]);
    }

    #[test]
    fn formats_records_end_to_end() {
        let sequences: SequenceDatabase = [("P1", "MKPEPTIDERGG")].into_iter().collect();
        let records = vec![
            RawRecord::new("P1;P9", "PEPT[Phospho (STY)]IDER", "PEPTIDER"),
        ];
        let result = format_input_data(&records, &sequences, default_tag_pattern());
        assert_eq!(result.value.len(), 1);
        assert_eq!((result.value[0].start, result.value[0].end), (3, 10));
        assert_eq!(result.value[0].ptm_sites, vec![3]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].to_string(), "No matching entry for P9");
    }
}
