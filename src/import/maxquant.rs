use std::collections::HashSet;

use super::table::{cell, DelimitedTable};
use super::{dedup_records, distinct_values, RawRecord, ResultImporter, SampleFilter};
use crate::error::{PipelineError, Result};
use crate::sequence::{canonical_label, tokenize_enclosed, CanonicalPeptide, InlineToken};

const TOOL: &str = "MaxQuant";

pub const PROTEINS: &str = "Proteins";
pub const MODIFIED_SEQUENCE: &str = "Modified sequence";
pub const RAW_FILE: &str = "Raw file";

/// MaxQuant `evidence.txt` importer.
pub struct MaxQuant;

impl ResultImporter for MaxQuant {
    fn tool(&self) -> &'static str {
        TOOL
    }

    fn matches_signature(&self, columns: &HashSet<&str>) -> bool {
        [PROTEINS, MODIFIED_SEQUENCE, RAW_FILE]
            .iter()
            .all(|c| columns.contains(c))
    }

    fn import_table(&self, table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
        import_enclosed(
            table,
            sample,
            EnclosedColumns {
                tool: TOOL,
                proteins: PROTEINS,
                modified_sequence: MODIFIED_SEQUENCE,
                sample: RAW_FILE,
            },
            '(',
            ')',
        )
    }

    fn sample_names(&self, table: &DelimitedTable) -> Result<Vec<String>> {
        distinct_values(table, RAW_FILE)
    }
}

/// Column names of a tool reporting modifications as enclosed inline tags.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EnclosedColumns {
    pub tool: &'static str,
    pub proteins: &'static str,
    pub modified_sequence: &'static str,
    pub sample: &'static str,
}

/// Shared import path for MaxQuant and Spectronaut exports.
pub(crate) fn import_enclosed(
    table: &DelimitedTable,
    sample: &SampleFilter,
    columns: EnclosedColumns,
    open: char,
    close: char,
) -> Result<Vec<RawRecord>> {
    let idx = table.require_columns(
        columns.tool,
        &[columns.proteins, columns.modified_sequence, columns.sample],
    )?;
    let (proteins_idx, sequence_idx, sample_idx) = (idx[0], idx[1], idx[2]);

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        if !sample.matches(cell(row, sample_idx)) {
            continue;
        }
        let proteins = cell(row, proteins_idx);
        let raw_sequence = cell(row, sequence_idx);
        if proteins.is_empty() || raw_sequence.is_empty() {
            continue;
        }

        let peptide = normalize_enclosed(columns.tool, raw_sequence, open, close)?;
        records.push(RawRecord::new(proteins, peptide.to_string(), peptide.bare()));
    }

    Ok(dedup_records(records))
}

/// Converts an underscore-wrapped inline-tagged sequence to canonical notation.
///
/// Full tag names are kept, with protein-terminal contexts rewritten to the
/// peptide-terminal labels. MaxQuant's legacy two-letter codes are expanded.
pub fn normalize_enclosed(
    tool: &'static str,
    sequence: &str,
    open: char,
    close: char,
) -> Result<CanonicalPeptide> {
    let trimmed = sequence.trim().trim_matches('_');
    let tokens =
        tokenize_enclosed(trimmed, open, close).map_err(|reason| PipelineError::MalformedSequence {
            tool,
            sequence: sequence.to_string(),
            reason,
        })?;

    let mut peptide = CanonicalPeptide::new();
    for token in tokens {
        match token {
            InlineToken::Residue(residue) => peptide.push_residue(residue),
            InlineToken::Tag(body) => {
                let residue = peptide.last_residue();
                let label = if is_legacy_code(&body) {
                    legacy_label(&body, residue).ok_or_else(|| PipelineError::UnknownModification {
                        tool,
                        token: body.clone(),
                        residue: residue.map(String::from).unwrap_or_else(|| "N-term".into()),
                        sequence: sequence.to_string(),
                    })?
                } else {
                    canonical_label(&body)
                };
                peptide.modify_last(label);
            }
        }
    }
    Ok(peptide)
}

fn is_legacy_code(body: &str) -> bool {
    !body.is_empty() && body.len() <= 3 && body.chars().all(|c| c.is_ascii_lowercase())
}

/// Expands MaxQuant's abbreviated modification codes. `residue` is `None` at the N-terminus.
fn legacy_label(code: &str, residue: Option<char>) -> Option<String> {
    let label = match (code, residue) {
        ("ac", None) => "Acetyl (N-term)",
        ("ac", Some('K')) => "Acetyl (K)",
        ("ox", Some('M')) => "Oxidation (M)",
        ("ph", Some('S' | 'T' | 'Y')) => "Phospho (STY)",
        ("de", Some('N' | 'Q')) => "Deamidation (NQ)",
        ("gl", Some('K')) => "GlyGly (K)",
        _ => return None,
    };
    Some(label.to_string())
}
