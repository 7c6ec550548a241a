//! Per-protein view over an annotated peptide table.
//!
//! Collects what a downstream renderer needs for one protein: its metadata,
//! the identified peptides, overlapping UniProt features, predicted cleavage
//! sites and sequence coverage.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::cleavage::get_cleavage_sites;
use crate::error::{PipelineError, Result};
use crate::fasta::{ReferenceSequence, SequenceDatabase};
use crate::pipeline::annotate::{overlapping_features, FeatureOverlap, ModifiedRecord};
use crate::reference::ReferenceContext;
use crate::uniprot::{format_features, FeatureCategory, FormattedFeature};

/// Descriptive fields of one reference protein.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinMetadata {
    pub accession: String,
    pub name: String,
    pub gene: Option<String>,
    pub entry: String,
}

impl ProteinMetadata {
    pub fn from_reference(entry: &ReferenceSequence) -> Self {
        Self {
            accession: entry.accession.clone(),
            name: entry.description.name.clone(),
            gene: entry.description.gene.clone(),
            entry: entry.description.entry.clone(),
        }
    }

    /// `GENE (ACCESSION)`; the entry name stands in for a missing gene.
    pub fn label(&self) -> String {
        let gene = self.gene.as_deref().unwrap_or(&self.entry);
        format!("{} ({})", gene, self.accession)
    }
}

/// Labels of every identified protein present in the reference, keyed and
/// ordered by accession.
pub fn protein_labels<'a>(
    accessions: impl IntoIterator<Item = &'a str>,
    sequences: &SequenceDatabase,
) -> BTreeMap<String, String> {
    accessions
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|accession| sequences.get(accession))
        .map(|entry| {
            let metadata = ProteinMetadata::from_reference(entry);
            (metadata.accession.clone(), metadata.label())
        })
        .collect()
}

/// Keeps proteins named in a predefined list, one accession or gene per line
/// (case-insensitive).
pub fn filter_by_list(labels: BTreeMap<String, String>, list: &str) -> BTreeMap<String, String> {
    let wanted: HashSet<String> = list
        .lines()
        .map(|line| line.trim().to_uppercase())
        .filter(|line| !line.is_empty())
        .collect();

    labels
        .into_iter()
        .filter(|(accession, label)| {
            let gene = label.split_whitespace().next().unwrap_or_default();
            wanted.contains(accession) || wanted.contains(gene)
        })
        .collect()
}

/// The accession inside a `GENE (ACCESSION)` label.
pub fn accession_from_label(label: &str) -> Option<&str> {
    let open = label.find('(')?;
    let close = open + label[open..].find(')')?;
    let accession = &label[open + 1..close];
    (!accession.is_empty()).then_some(accession)
}

/// Display name of a dataset: an explicit name wins, then the selected
/// samples joined by `;` with `remove_prefix` stripped, then the file stem.
pub fn dataset_name(
    path: &Path,
    samples: &[String],
    custom_name: Option<&str>,
    remove_prefix: &str,
) -> String {
    if let Some(name) = custom_name.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if !samples.is_empty() {
        let joined = samples.join(";");
        return if remove_prefix.is_empty() {
            joined
        } else {
            joined.replace(remove_prefix, "")
        };
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or_default()
        .to_string()
}

/// Fraction of residues covered by at least one peptide span (1-based, inclusive).
pub fn sequence_coverage<'a>(
    protein_length: usize,
    peptides: impl IntoIterator<Item = &'a ModifiedRecord>,
) -> f64 {
    if protein_length == 0 {
        return 0.0;
    }
    let mut covered = vec![false; protein_length];
    for peptide in peptides {
        let start = peptide.start.saturating_sub(1);
        let end = peptide.end.min(protein_length);
        if start < end {
            covered[start..end].fill(true);
        }
    }
    covered.iter().filter(|&&c| c).count() as f64 / protein_length as f64
}

/// Everything known about one protein in one dataset.
#[derive(Debug, Clone)]
pub struct ProteinView<'a> {
    pub metadata: ProteinMetadata,
    pub sequence: &'a str,
    pub peptides: Vec<&'a ModifiedRecord>,
    pub overlaps: Vec<FeatureOverlap<'a>>,
    pub features: Vec<FormattedFeature>,
    pub cleavage_sites: BTreeMap<String, Vec<usize>>,
    pub coverage: f64,
}

impl<'a> ProteinView<'a> {
    /// Builds the view of `accession`. `categories` are feature display names
    /// (e.g. "Modified residue"); `proteases` are cleavage-table names.
    pub fn build(
        accession: &str,
        records: &'a [ModifiedRecord],
        context: &'a ReferenceContext,
        categories: &[&str],
        proteases: &[&str],
    ) -> Result<Self> {
        let entry = context
            .sequences
            .get(accession)
            .ok_or_else(|| PipelineError::UnknownAccession {
                accession: accession.to_string(),
            })?;

        let peptides: Vec<&ModifiedRecord> = records
            .iter()
            .filter(|r| r.unique_protein_id == accession)
            .collect();

        let overlaps = overlapping_features(records, &context.annotations)
            .into_iter()
            .filter(|o| o.record.unique_protein_id == accession)
            .collect();

        let codes = FeatureCategory::codes_for(categories.iter().copied());
        let features = format_features(context.annotations_for(accession), &codes);

        let cleavage_sites = proteases
            .iter()
            .map(|&name| {
                get_cleavage_sites(&entry.sequence, name).map(|sites| (name.to_string(), sites))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        let coverage = sequence_coverage(entry.sequence.len(), peptides.iter().copied());
        log::debug!(
            "{}: {} peptides, {} features, coverage {:.1}%",
            accession,
            peptides.len(),
            features.len(),
            coverage * 100.0
        );

        Ok(Self {
            metadata: ProteinMetadata::from_reference(entry),
            sequence: &entry.sequence,
            peptides,
            overlaps,
            features,
            cleavage_sites,
            coverage,
        })
    }
}
