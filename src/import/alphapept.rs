use std::collections::HashSet;

use super::table::{cell, DelimitedTable};
use super::{
    dedup_records, distinct_values, extract_uniprot_id, RawRecord, ResultImporter, SampleFilter,
    PROTEIN_ID_SEPARATOR,
};
use crate::error::{PipelineError, Result};
use crate::sequence::CanonicalPeptide;

const TOOL: &str = "AlphaPept";

pub const PROTEIN_GROUP: &str = "protein_group";
pub const SEQUENCE: &str = "sequence";
pub const SHORTNAME: &str = "shortname";

/// AlphaPept `results_peptides` importer. Modifications are lowercase prefixes
/// written before the residue they modify.
pub struct AlphaPept;

impl ResultImporter for AlphaPept {
    fn tool(&self) -> &'static str {
        TOOL
    }

    fn matches_signature(&self, columns: &HashSet<&str>) -> bool {
        [PROTEIN_GROUP, SEQUENCE, SHORTNAME]
            .iter()
            .all(|c| columns.contains(c))
    }

    fn import_table(&self, table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
        let idx = table.require_columns(TOOL, &[PROTEIN_GROUP, SEQUENCE, SHORTNAME])?;
        let (group_idx, sequence_idx, sample_idx) = (idx[0], idx[1], idx[2]);

        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            if !sample.matches(cell(row, sample_idx)) {
                continue;
            }
            let proteins = protein_ids(cell(row, group_idx));
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
        distinct_values(table, SHORTNAME)
    }
}

/// Converts a comma-separated FASTA header group into `;`-joined accessions.
fn protein_ids(group: &str) -> String {
    group
        .split(',')
        .map(extract_uniprot_id)
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>()
        .join(&PROTEIN_ID_SEPARATOR.to_string())
}

/// Where a modification prefix is applied.
enum Placement {
    Residue(&'static str),
    NTerm(&'static str),
    CTerm(&'static str),
}

/// Converts an AlphaPept sequence such as `aMDEPSoxMK` to canonical notation.
pub fn normalize(sequence: &str) -> Result<CanonicalPeptide> {
    let residue_count = sequence.chars().filter(char::is_ascii_uppercase).count();
    let mut peptide = CanonicalPeptide::new();
    let mut prefix = String::new();

    for c in sequence.chars() {
        if c.is_ascii_lowercase() {
            prefix.push(c);
            continue;
        }
        if !c.is_ascii_uppercase() {
            return Err(PipelineError::MalformedSequence {
                tool: TOOL,
                sequence: sequence.to_string(),
                reason: format!("unexpected character '{c}'"),
            });
        }

        peptide.push_residue(c);
        if prefix.is_empty() {
            continue;
        }

        let position = peptide.len() - 1;
        let placement = placement(&prefix, c, position, residue_count).ok_or_else(|| {
            PipelineError::UnknownModification {
                tool: TOOL,
                token: prefix.clone(),
                residue: c.to_string(),
                sequence: sequence.to_string(),
            }
        })?;
        match placement {
            Placement::Residue(label) => peptide.modify_last(label),
            Placement::NTerm(label) => peptide.modify_n_term(label),
            Placement::CTerm(label) => peptide.modify_c_term(label),
        }
        prefix.clear();
    }

    if !prefix.is_empty() {
        return Err(PipelineError::MalformedSequence {
            tool: TOOL,
            sequence: sequence.to_string(),
            reason: format!("modification '{prefix}' is not followed by a residue"),
        });
    }
    Ok(peptide)
}

fn placement(prefix: &str, residue: char, position: usize, residue_count: usize) -> Option<Placement> {
    let is_first = position == 0;
    let is_last = position + 1 == residue_count;
    let placement = match (prefix, residue) {
        ("ox", 'M') => Placement::Residue("Oxidation (M)"),
        ("ox", 'P') => Placement::Residue("Oxidation (MP)"),
        ("a", _) if is_first => Placement::NTerm("Acetyl (N-term)"),
        ("a", 'K') => Placement::Residue("Acetyl (K)"),
        ("am", _) if is_last => Placement::CTerm("Amidated (C-term)"),
        ("deam", 'N' | 'Q') => Placement::Residue("Deamidation (NQ)"),
        ("p", 'S' | 'T' | 'Y') => Placement::Residue("Phospho (STY)"),
        ("pg", 'E') => Placement::Residue("Glu->pyro-Glu"),
        ("pg", 'Q') => Placement::Residue("Gln->pyro-Glu"),
        ("c", 'C') => Placement::Residue("Cys-Cys"),
        _ => return None,
    };
    Some(placement)
}
