use std::collections::HashSet;

use super::table::{cell, DelimitedTable};
use super::{dedup_records, distinct_values, RawRecord, ResultImporter, SampleFilter};
use crate::error::{PipelineError, Result};
use crate::sequence::{tokenize_enclosed, CanonicalPeptide, InlineToken};

const TOOL: &str = "DIA-NN";

pub const PROTEIN_IDS: &str = "Protein.Ids";
pub const MODIFIED_SEQUENCE: &str = "Modified.Sequence";
pub const RUN: &str = "Run";

/// DIA-NN main report importer. Modifications are `(UniMod:N)` tags.
pub struct DiaNn;

impl ResultImporter for DiaNn {
    fn tool(&self) -> &'static str {
        TOOL
    }

    fn matches_signature(&self, columns: &HashSet<&str>) -> bool {
        [PROTEIN_IDS, MODIFIED_SEQUENCE, RUN]
            .iter()
            .all(|c| columns.contains(c))
    }

    fn import_table(&self, table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
        let idx = table.require_columns(TOOL, &[PROTEIN_IDS, MODIFIED_SEQUENCE, RUN])?;
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

            let peptide = normalize(raw_sequence)?;
            records.push(RawRecord::new(proteins, peptide.to_string(), peptide.bare()));
        }

        Ok(dedup_records(records))
    }

    fn sample_names(&self, table: &DelimitedTable) -> Result<Vec<String>> {
        distinct_values(table, RUN)
    }
}

/// Converts a DIA-NN sequence such as `(UniMod:1)PEPC(UniMod:4)K` to canonical notation.
pub fn normalize(sequence: &str) -> Result<CanonicalPeptide> {
    let malformed = |reason: String| PipelineError::MalformedSequence {
        tool: TOOL,
        sequence: sequence.to_string(),
        reason,
    };

    let tokens = tokenize_enclosed(sequence.trim().trim_matches('_'), '(', ')').map_err(malformed)?;
    let residue_count = tokens
        .iter()
        .filter(|t| matches!(t, InlineToken::Residue(_)))
        .count();

    let mut peptide = CanonicalPeptide::new();
    for token in tokens {
        let body = match token {
            InlineToken::Residue(residue) => {
                peptide.push_residue(residue);
                continue;
            }
            InlineToken::Tag(body) => body,
        };

        let unimod = body
            .strip_prefix("UniMod:")
            .and_then(|id| id.trim().parse::<u32>().ok());
        let residue = peptide.last_residue();
        let is_c_terminal = !peptide.is_empty() && peptide.len() == residue_count;

        let label = unimod.and_then(|id| unimod_label(id, residue, is_c_terminal));
        let Some(label) = label else {
            return Err(PipelineError::UnknownModification {
                tool: TOOL,
                token: body,
                residue: residue.map(String::from).unwrap_or_else(|| "N-term".into()),
                sequence: sequence.to_string(),
            });
        };

        match label {
            UniModPlacement::NTerm(label) => peptide.modify_n_term(label),
            UniModPlacement::CTerm(label) => peptide.modify_c_term(label),
            UniModPlacement::Residue(label) => peptide.modify_last(label),
        }
    }
    Ok(peptide)
}

enum UniModPlacement {
    NTerm(&'static str),
    Residue(&'static str),
    CTerm(&'static str),
}

/// Maps a UniMod accession on `residue` (`None` = N-terminus) to its label.
fn unimod_label(id: u32, residue: Option<char>, is_c_terminal: bool) -> Option<UniModPlacement> {
    use UniModPlacement::*;
    let placement = match (id, residue) {
        (1, None) => NTerm("Acetyl (N-term)"),
        (1, Some('K')) => Residue("Acetyl (K)"),
        (2, Some(_)) if is_c_terminal => CTerm("Amidated (C-term)"),
        (4, Some('C')) => Residue("Carbamidomethyl (C)"),
        (7, Some('N' | 'Q')) => Residue("Deamidation (NQ)"),
        (21, Some('S' | 'T' | 'Y')) => Residue("Phospho (STY)"),
        (23, Some('S' | 'T')) => Residue("Dehydrated (ST)"),
        (23, Some('Y')) => Residue("Dehydrated (Y)"),
        (27, Some('E')) => Residue("Glu->pyro-Glu"),
        (28, Some('Q')) => Residue("Gln->pyro-Glu"),
        (35, Some('M')) => Residue("Oxidation (M)"),
        (35, Some('P')) => Residue("Oxidation (MP)"),
        (121, Some('K')) => Residue("GlyGly (K)"),
        _ => return None,
    };
    Some(placement)
}
