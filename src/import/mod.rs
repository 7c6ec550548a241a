//! Tool-specific importers and the unified import dispatcher.
//!
//! Every importer reduces a tool export to [`RawRecord`]s: a `;`-joined accession
//! list, the peptide in canonical notation, and the bare peptide.

pub mod alphapept;
pub mod diann;
pub mod fragpipe;
pub mod maxquant;
pub mod spectronaut;
pub mod table;

use csv::StringRecord;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::reader::DEFAULT_BUFFER_SIZE;
use table::DelimitedTable;

/// Separator between accessions in [`RawRecord::all_protein_ids`].
pub const PROTEIN_ID_SEPARATOR: char = ';';

/// One peptide identification reduced to the columns the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawRecord {
    pub all_protein_ids: String,
    pub modified_sequence: String,
    pub naked_sequence: String,
}

impl RawRecord {
    pub fn new(
        all_protein_ids: impl Into<String>,
        modified_sequence: impl Into<String>,
        naked_sequence: impl Into<String>,
    ) -> Self {
        Self {
            all_protein_ids: all_protein_ids.into(),
            modified_sequence: modified_sequence.into(),
            naked_sequence: naked_sequence.into(),
        }
    }

    pub fn accessions(&self) -> impl Iterator<Item = &str> {
        self.all_protein_ids.split(PROTEIN_ID_SEPARATOR)
    }
}

/// Which runs of a multi-run export to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SampleFilter {
    #[default]
    All,
    Only(Vec<String>),
}

impl SampleFilter {
    pub fn matches(&self, sample: &str) -> bool {
        match self {
            SampleFilter::All => true,
            SampleFilter::Only(samples) => samples.iter().any(|s| s == sample),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, SampleFilter::All)
    }
}

impl From<&str> for SampleFilter {
    fn from(sample: &str) -> Self {
        SampleFilter::Only(vec![sample.to_string()])
    }
}

impl From<String> for SampleFilter {
    fn from(sample: String) -> Self {
        SampleFilter::Only(vec![sample])
    }
}

impl From<Vec<String>> for SampleFilter {
    /// An empty list means no filtering.
    fn from(samples: Vec<String>) -> Self {
        if samples.is_empty() {
            SampleFilter::All
        } else {
            SampleFilter::Only(samples)
        }
    }
}

impl From<&[&str]> for SampleFilter {
    fn from(samples: &[&str]) -> Self {
        samples
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into()
    }
}

impl<T: Into<SampleFilter>> From<Option<T>> for SampleFilter {
    fn from(sample: Option<T>) -> Self {
        sample.map_or(SampleFilter::All, Into::into)
    }
}

/// The upstream tools whose exports can be imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    MaxQuant,
    Spectronaut,
    AlphaPept,
    DiaNn,
    FragPipe,
}

impl SourceFormat {
    /// Detection order: the first format whose column signature matches wins.
    pub const ALL: [SourceFormat; 5] = [
        SourceFormat::MaxQuant,
        SourceFormat::Spectronaut,
        SourceFormat::AlphaPept,
        SourceFormat::DiaNn,
        SourceFormat::FragPipe,
    ];

    pub fn importer(self) -> &'static dyn ResultImporter {
        match self {
            SourceFormat::MaxQuant => &maxquant::MaxQuant,
            SourceFormat::Spectronaut => &spectronaut::Spectronaut,
            SourceFormat::AlphaPept => &alphapept::AlphaPept,
            SourceFormat::DiaNn => &diann::DiaNn,
            SourceFormat::FragPipe => &fragpipe::FragPipe,
        }
    }

    /// Matches a header row against the known column signatures.
    pub fn detect(headers: &StringRecord) -> Option<SourceFormat> {
        let columns: HashSet<&str> = headers.iter().map(str::trim).collect();
        Self::ALL
            .into_iter()
            .find(|format| format.importer().matches_signature(&columns))
    }

    pub fn tool(self) -> &'static str {
        self.importer().tool()
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool())
    }
}

/// One upstream tool: its column signature, sample column and row conversion.
pub trait ResultImporter: Sync {
    /// Human-readable tool name used in error messages.
    fn tool(&self) -> &'static str;

    /// Whether a header row belongs to this tool.
    fn matches_signature(&self, columns: &HashSet<&str>) -> bool;

    /// Converts a loaded export into normalized records.
    fn import_table(&self, table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>>;

    /// Distinct run names present in the export.
    fn sample_names(&self, table: &DelimitedTable) -> Result<Vec<String>>;
}

/// Imports a file with a specific importer.
pub fn import_with(
    format: SourceFormat,
    path: &Path,
    sample: impl Into<SampleFilter>,
) -> Result<Vec<RawRecord>> {
    import_buffered(format, path, sample, DEFAULT_BUFFER_SIZE)
}

/// [`import_with`] reading through a buffer of `buffer_size` bytes.
pub fn import_buffered(
    format: SourceFormat,
    path: &Path,
    sample: impl Into<SampleFilter>,
    buffer_size: usize,
) -> Result<Vec<RawRecord>> {
    let table = DelimitedTable::read_buffered(path, buffer_size)?;
    let records = format.importer().import_table(&table, &sample.into())?;
    log::info!(
        "Imported {} {} records from {}",
        records.len(),
        format,
        path.display()
    );
    Ok(records)
}

/// Detects the export format of `path` from its header row.
pub fn detect_format(path: &Path) -> Result<SourceFormat> {
    let headers = DelimitedTable::read_headers(path)?;
    SourceFormat::detect(&headers).ok_or_else(|| PipelineError::UnrecognizedFormat {
        path: path.to_path_buf(),
    })
}

/// Reads any supported export, routing on its column signature.
pub fn import_any(path: &Path, sample: impl Into<SampleFilter>) -> Result<Vec<RawRecord>> {
    let format = detect_format(path)?;
    log::debug!("Detected {} format for {}", format, path.display());
    import_with(format, path, sample)
}

/// Lists the run names of any supported export in natural order.
pub fn sample_names(path: &Path) -> Result<Vec<String>> {
    let format = detect_format(path)?;
    let table = DelimitedTable::read(path)?;
    let mut names = format.importer().sample_names(&table)?;
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names)
}

/// Collects the distinct non-empty values of one column.
pub(crate) fn distinct_values(table: &DelimitedTable, column: &str) -> Result<Vec<String>> {
    let index = table
        .column(column)
        .ok_or_else(|| PipelineError::MissingSampleColumn {
            path: table.path.clone(),
        })?;
    let values: BTreeSet<String> = table
        .rows
        .iter()
        .map(|row| table::cell(row, index))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok(values.into_iter().collect())
}

/// Drops exact duplicate records, keeping first occurrences in order.
pub(crate) fn dedup_records(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Reduces a FASTA-style protein identifier to its accession.
///
/// `sp|P02769|ALBU_BOVIN` becomes `P02769`; contaminant/decoy prefixes such as
/// `CON__P02769` are removed. Plain accessions pass through.
pub fn extract_uniprot_id(identifier: &str) -> &str {
    let identifier = identifier.trim();
    if let Some((_, rest)) = identifier.split_once('|') {
        return rest.split('|').next().unwrap_or(rest);
    }
    if let Some((_, rest)) = identifier.split_once("__") {
        return rest;
    }
    identifier
}

/// Compares strings so that embedded numbers sort numerically (`raw_2` < `raw_10`).
/// Text runs compare case-sensitively, so uppercase names sort first.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let chunks_a = natural_chunks(a);
    let chunks_b = natural_chunks(b);
    for (x, y) in chunks_a.iter().zip(chunks_b.iter()) {
        let ordering = match (x, y) {
            (NaturalChunk::Number(x), NaturalChunk::Number(y)) => x.cmp(y),
            (NaturalChunk::Text(x), NaturalChunk::Text(y)) => x.cmp(y),
            (NaturalChunk::Number(_), NaturalChunk::Text(_)) => Ordering::Less,
            (NaturalChunk::Text(_), NaturalChunk::Number(_)) => Ordering::Greater,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    chunks_a.len().cmp(&chunks_b.len())
}

#[derive(Debug, PartialEq, Eq)]
enum NaturalChunk {
    Number(u128),
    Text(String),
}

fn natural_chunks(s: &str) -> Vec<NaturalChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut in_digits = false;

    for c in s.chars() {
        let is_digit = c.is_ascii_digit();
        if is_digit != in_digits {
            flush_chunk(&mut current, in_digits, &mut chunks);
            in_digits = is_digit;
        }
        current.push(c);
    }
    flush_chunk(&mut current, in_digits, &mut chunks);
    chunks
}

fn flush_chunk(current: &mut String, in_digits: bool, chunks: &mut Vec<NaturalChunk>) {
    if current.is_empty() {
        return;
    }
    let chunk = if in_digits {
        current
            .parse::<u128>()
            .map(NaturalChunk::Number)
            .unwrap_or_else(|_| NaturalChunk::Text(current.clone()))
    } else {
        NaturalChunk::Text(current.clone())
    };
    chunks.push(chunk);
    current.clear();
}
