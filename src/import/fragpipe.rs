use std::collections::HashSet;

use super::table::{cell, DelimitedTable};
use super::{
    dedup_records, extract_uniprot_id, RawRecord, ResultImporter, SampleFilter,
    PROTEIN_ID_SEPARATOR,
};
use crate::error::{PipelineError, Result};
use crate::sequence::CanonicalPeptide;

const TOOL: &str = "FragPipe";

pub const PEPTIDE: &str = "Peptide";
pub const SEQUENCE: &str = "Sequence";
pub const PROTEIN_ID: &str = "Protein ID";
pub const MAPPED_PROTEINS: &str = "Mapped Proteins";
pub const ASSIGNED_MODIFICATIONS: &str = "Assigned Modifications";
pub const SPECTRAL_COUNT_SUFFIX: &str = " Spectral Count";

const MASS_TOLERANCE: f64 = 0.001;

/// FragPipe importer for per-run `peptide.tsv`/`psm.tsv` files and the
/// combined multi-run `combined_peptide.tsv`.
pub struct FragPipe;

/// Which FragPipe export a header row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragPipeMode {
    /// Single run with localized modifications.
    PerRun,
    /// All runs with per-sample spectral counts and no localization.
    Combined,
}

impl FragPipeMode {
    pub fn detect<'a>(columns: impl IntoIterator<Item = &'a str>) -> Option<FragPipeMode> {
        let columns: HashSet<&str> = columns.into_iter().map(str::trim).collect();
        let has = |c: &str| columns.contains(c);
        if !has(PROTEIN_ID) || !has(MAPPED_PROTEINS) {
            return None;
        }
        if has(PEPTIDE) && has(ASSIGNED_MODIFICATIONS) {
            Some(FragPipeMode::PerRun)
        } else if has(SEQUENCE) && columns.iter().any(|c| spectral_count_sample(c).is_some()) {
            Some(FragPipeMode::Combined)
        } else {
            None
        }
    }
}

impl ResultImporter for FragPipe {
    fn tool(&self) -> &'static str {
        TOOL
    }

    fn matches_signature(&self, columns: &HashSet<&str>) -> bool {
        FragPipeMode::detect(columns.iter().copied()).is_some()
    }

    fn import_table(&self, table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
        match FragPipeMode::detect(table.headers.iter()) {
            Some(FragPipeMode::Combined) => import_combined(table, sample),
            _ => import_per_run(table, sample),
        }
    }

    fn sample_names(&self, table: &DelimitedTable) -> Result<Vec<String>> {
        let names: Vec<String> = table
            .headers
            .iter()
            .filter_map(spectral_count_sample)
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(PipelineError::MissingSampleColumn {
                path: table.path.clone(),
            });
        }
        Ok(names)
    }
}

/// Returns the sample name of a `<sample> Spectral Count` header.
fn spectral_count_sample(header: &str) -> Option<&str> {
    header
        .trim()
        .strip_suffix(SPECTRAL_COUNT_SUFFIX)
        .filter(|name| !name.is_empty() && *name != "Total")
}

fn import_per_run(table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
    let idx = table.require_columns(
        TOOL,
        &[PEPTIDE, PROTEIN_ID, MAPPED_PROTEINS, ASSIGNED_MODIFICATIONS],
    )?;
    let (peptide_idx, protein_idx, mapped_idx, mods_idx) = (idx[0], idx[1], idx[2], idx[3]);

    if !sample.is_all() {
        log::warn!(
            "{} holds a single FragPipe run; ignoring the sample selection",
            table.path.display()
        );
    }

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let proteins = protein_ids(cell(row, protein_idx), cell(row, mapped_idx));
        let sequence = cell(row, peptide_idx);
        if proteins.is_empty() || sequence.is_empty() {
            continue;
        }
        let peptide = normalize(sequence, cell(row, mods_idx))?;
        records.push(RawRecord::new(proteins, peptide.to_string(), peptide.bare()));
    }

    Ok(dedup_records(records))
}

fn import_combined(table: &DelimitedTable, sample: &SampleFilter) -> Result<Vec<RawRecord>> {
    let idx = table.require_columns(TOOL, &[SEQUENCE, PROTEIN_ID, MAPPED_PROTEINS])?;
    let (sequence_idx, protein_idx, mapped_idx) = (idx[0], idx[1], idx[2]);

    let count_columns: Vec<usize> = match sample {
        SampleFilter::All => Vec::new(),
        SampleFilter::Only(samples) => {
            let names: Vec<String> = samples
                .iter()
                .map(|s| format!("{s}{SPECTRAL_COUNT_SUFFIX}"))
                .collect();
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            table.require_columns(TOOL, &names)?
        }
    };

    log::info!(
        "{} is a combined FragPipe export; modification localization is not available",
        table.path.display()
    );

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let observed = count_columns.is_empty()
            || count_columns
                .iter()
                .any(|&i| cell(row, i).parse::<f64>().is_ok_and(|count| count > 0.0));
        if !observed {
            continue;
        }

        let proteins = protein_ids(cell(row, protein_idx), cell(row, mapped_idx));
        let sequence = cell(row, sequence_idx);
        if proteins.is_empty() || sequence.is_empty() {
            continue;
        }
        records.push(RawRecord::new(proteins, sequence, sequence));
    }

    Ok(dedup_records(records))
}

/// Joins the leading protein with the mapped alternatives, deduplicated in order.
fn protein_ids(protein_id: &str, mapped_proteins: &str) -> String {
    let mut seen = HashSet::new();
    std::iter::once(protein_id)
        .chain(mapped_proteins.split(','))
        .map(extract_uniprot_id)
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect::<Vec<_>>()
        .join(&PROTEIN_ID_SEPARATOR.to_string())
}

/// Where an assigned modification sits.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Site {
    NTerm,
    CTerm,
    Residue { position: usize, residue: char },
}

/// Interleaves FragPipe's `Assigned Modifications` into the bare sequence.
///
/// Descriptors look like `10M(15.9949)`, `N-term(42.0106)` or `C-term(-0.9840)`
/// with 1-based positions; masses are matched within 0.001 Da.
pub fn normalize(sequence: &str, assigned_modifications: &str) -> Result<CanonicalPeptide> {
    let mut peptide = CanonicalPeptide::from_bare(sequence);
    let residues: Vec<char> = sequence.chars().collect();

    for descriptor in assigned_modifications
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        let (site, mass) = parse_descriptor(descriptor).ok_or_else(|| {
            PipelineError::MalformedSequence {
                tool: TOOL,
                sequence: sequence.to_string(),
                reason: format!("cannot parse modification '{descriptor}'"),
            }
        })?;

        let unknown = |residue: String| PipelineError::UnknownModification {
            tool: TOOL,
            token: descriptor.to_string(),
            residue,
            sequence: sequence.to_string(),
        };

        match site {
            Site::NTerm => {
                let label = terminal_label(mass, true).ok_or_else(|| unknown("N-term".into()))?;
                peptide.modify_n_term(label);
            }
            Site::CTerm => {
                let label = terminal_label(mass, false).ok_or_else(|| unknown("C-term".into()))?;
                peptide.modify_c_term(label);
            }
            Site::Residue { position, residue } => {
                if position == 0 || residues.get(position - 1) != Some(&residue) {
                    return Err(PipelineError::MalformedSequence {
                        tool: TOOL,
                        sequence: sequence.to_string(),
                        reason: format!("'{descriptor}' does not match residue {position}"),
                    });
                }
                let label = residue_label(residue, mass).ok_or_else(|| unknown(residue.to_string()))?;
                peptide.modify_at(position - 1, label);
            }
        }
    }

    Ok(peptide)
}

fn parse_descriptor(descriptor: &str) -> Option<(Site, f64)> {
    let (head, rest) = descriptor.split_once('(')?;
    let mass = rest.strip_suffix(')')?.trim().parse::<f64>().ok()?;

    let site = match head.trim() {
        "N-term" => Site::NTerm,
        "C-term" => Site::CTerm,
        head => {
            let residue = head.chars().last().filter(char::is_ascii_uppercase)?;
            let position = head[..head.len() - 1].parse::<usize>().ok()?;
            Site::Residue { position, residue }
        }
    };
    Some((site, mass))
}

fn mass_matches(observed: f64, expected: f64) -> bool {
    (observed - expected).abs() < MASS_TOLERANCE
}

fn terminal_label(mass: f64, n_term: bool) -> Option<&'static str> {
    if n_term && mass_matches(mass, 42.0106) {
        Some("Acetyl (N-term)")
    } else if !n_term && mass_matches(mass, -0.9840) {
        Some("Amidated (C-term)")
    } else {
        None
    }
}

/// Residue-specific mass shifts and their canonical labels.
const RESIDUE_SHIFTS: &[(&str, f64, &str)] = &[
    ("Q", -17.0265, "Gln->pyro-Glu"),
    ("E", -18.0106, "Glu->pyro-Glu"),
    ("ST", -18.0106, "Dehydrated (ST)"),
    ("Y", -18.0106, "Dehydrated (Y)"),
    ("M", 15.9949, "Oxidation (M)"),
    ("P", 15.9949, "Oxidation (MP)"),
    ("C", 57.0215, "Carbamidomethyl (C)"),
    ("K", 114.0429, "GlyGly (K)"),
    ("STY", 79.9663, "Phospho (STY)"),
    ("NQ", 0.9840, "Deamidation (NQ)"),
    ("K", 42.0106, "Acetyl (K)"),
];

fn residue_label(residue: char, mass: f64) -> Option<&'static str> {
    RESIDUE_SHIFTS
        .iter()
        .find(|(residues, shift, _)| residues.contains(residue) && mass_matches(mass, *shift))
        .map(|(_, _, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(sequence: &str, mods: &str) -> String {
        normalize(sequence, mods).unwrap().to_string()
    }

    #[test]
    fn terminal_modifications() {
        assert_eq!(
            canonical("AAEREPPPLGDGKPTDFEDLEDGEDLFTSTVSTLE", "N-term(42.0106)"),
            "[Acetyl (N-term)]AAEREPPPLGDGKPTDFEDLEDGEDLFTSTVSTLE"
        );
        assert_eq!(
            canonical(
                "AAEVISDARENIQRFFGHGAEDSLADQAANEWGRSGKDPNHFRPAGLPEKY",
                "C-term(-0.9840)"
            ),
            "AAEVISDARENIQRFFGHGAEDSLADQAANEWGRSGKDPNHFRPAGLPEKY[Amidated (C-term)]"
        );
    }

    #[test]
    fn first_residue_shifts() {
        assert_eq!(
            canonical("QESQSEEIDCNDKDLFKA", "1Q(-17.0265)"),
            "Q[Gln->pyro-Glu]ESQSEEIDCNDKDLFKA"
        );
        assert_eq!(
            canonical("EKPLLEKSHCIAEVENDEMPA", "1E(-18.0106)"),
            "E[Glu->pyro-Glu]KPLLEKSHCIAEVENDEMPA"
        );
        assert_eq!(
            canonical("SKPLLEKSHCIAEVENDEMPA", "1S(-18.0106)"),
            "S[Dehydrated (ST)]KPLLEKSHCIAEVENDEMPA"
        );
        assert_eq!(
            canonical("YKPLLEKSHCIAEVENDEMPA", "1Y(-18.0106)"),
            "Y[Dehydrated (Y)]KPLLEKSHCIAEVENDEMPA"
        );
    }

    #[test]
    fn several_modifications_follow_residue_order() {
        assert_eq!(
            canonical(
                "AAAAECDVVMAATEPELLDDQEAK",
                "10M(15.9949),6C(57.0215),N-term(42.0106)"
            ),
            "[Acetyl (N-term)]AAAAEC[Carbamidomethyl (C)]DVVM[Oxidation (M)]AATEPELLDDQEAK"
        );
        assert_eq!(
            canonical("PGFSIADKKR", "8K(114.0429),9K(114.0429)"),
            "PGFSIADK[GlyGly (K)]K[GlyGly (K)]R"
        );
        assert_eq!(canonical("CVNTTLQIK", ""), "CVNTTLQIK");
    }

    #[test]
    fn mismatched_or_unknown_descriptors_fail() {
        assert!(matches!(
            normalize("PEPTIDE", "2M(15.9949)").unwrap_err(),
            PipelineError::MalformedSequence { .. }
        ));
        assert!(matches!(
            normalize("PEPTIDE", "4T(12.3456)").unwrap_err(),
            PipelineError::UnknownModification { .. }
        ));
    }

    #[test]
    fn detects_both_modes() {
        let per_run = ["Peptide", "Protein ID", "Mapped Proteins", "Assigned Modifications"];
        let combined = [
            "Sequence",
            "Protein ID",
            "Mapped Proteins",
            "wt1 Spectral Count",
            "Y731F1 Spectral Count",
        ];
        assert_eq!(FragPipeMode::detect(per_run), Some(FragPipeMode::PerRun));
        assert_eq!(FragPipeMode::detect(combined), Some(FragPipeMode::Combined));
        assert_eq!(FragPipeMode::detect(["Sequence", "Protein ID"]), None);
    }

    #[test]
    fn mapped_proteins_are_merged() {
        assert_eq!(
            protein_ids("P12345", "sp|Q99999|X_HUMAN, P12345"),
            "P12345;Q99999"
        );
        assert_eq!(protein_ids("P12345", ""), "P12345");
    }
}
