use regex::Regex;
use std::collections::HashMap;

use super::position::PositionedRecord;
use crate::sequence::extract_sites;
use crate::uniprot::FeatureAnnotation;

/// A positioned row with its modification sites.
///
/// `ptm_sites` are 0-based offsets within the peptide; `ptm_types` holds the
/// matching tags in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedRecord {
    pub unique_protein_id: String,
    pub all_protein_ids: String,
    pub modified_sequence: String,
    pub naked_sequence: String,
    pub start: usize,
    pub end: usize,
    pub ptm_sites: Vec<usize>,
    pub ptm_types: Vec<String>,
}

impl ModifiedRecord {
    /// Absolute 1-based protein positions of the modification sites.
    pub fn protein_sites(&self) -> impl Iterator<Item = usize> + '_ {
        self.ptm_sites.iter().map(move |offset| self.start + offset)
    }
}

/// Attaches modification sites to every row. Row-local, order-preserving.
pub fn annotate(records: Vec<PositionedRecord>, tag_pattern: &Regex) -> Vec<ModifiedRecord> {
    records
        .into_iter()
        .map(|record| {
            let (ptm_sites, ptm_types) = extract_sites(&record.modified_sequence, tag_pattern);
            ModifiedRecord {
                unique_protein_id: record.unique_protein_id,
                all_protein_ids: record.all_protein_ids,
                modified_sequence: record.modified_sequence,
                naked_sequence: record.naked_sequence,
                start: record.start,
                end: record.end,
                ptm_sites,
                ptm_types,
            }
        })
        .collect()
}

/// A peptide paired with a feature it overlaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureOverlap<'a> {
    pub record: &'a ModifiedRecord,
    pub feature: &'a FeatureAnnotation,
}

/// Joins peptides with features of the same protein whose span overlaps the
/// peptide span, both inclusive. Features with an unknown start are skipped.
pub fn overlapping_features<'a>(
    records: &'a [ModifiedRecord],
    annotations: &'a [FeatureAnnotation],
) -> Vec<FeatureOverlap<'a>> {
    let mut by_protein: HashMap<&str, Vec<&FeatureAnnotation>> = HashMap::new();
    for annotation in annotations {
        by_protein
            .entry(annotation.protein_id.as_str())
            .or_default()
            .push(annotation);
    }

    let mut overlaps = Vec::new();
    for record in records {
        let Some(features) = by_protein.get(record.unique_protein_id.as_str()) else {
            continue;
        };
        for feature in features {
            if feature.overlaps(record.start as i64, record.end as i64) {
                overlaps.push(FeatureOverlap { record, feature });
            }
        }
    }
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::default_tag_pattern;

    fn positioned(modified: &str, naked: &str, start: usize) -> PositionedRecord {
        PositionedRecord {
            unique_protein_id: "P1".into(),
            all_protein_ids: "P1".into(),
            modified_sequence: modified.into(),
            naked_sequence: naked.into(),
            start,
            end: start + naked.len() - 1,
        }
    }

    fn feature(start: i64, end: Option<i64>) -> FeatureAnnotation {
        FeatureAnnotation {
            protein_id: "P1".into(),
            feature: "DOMAIN".into(),
            isoform_id: String::new(),
            start,
            end,
            note: String::new(),
        }
    }

    #[test]
    fn attaches_sites_per_row() {
        let rows = annotate(
            vec![
                positioned("PEPT[Phospho (STY)]IDER", "PEPTIDER", 3),
                positioned("VIEWER", "VIEWER", 1),
            ],
            default_tag_pattern(),
        );
        assert_eq!(rows[0].ptm_sites, vec![3]);
        assert_eq!(rows[0].ptm_types, vec!["[Phospho (STY)]"]);
        assert_eq!(rows[0].protein_sites().collect::<Vec<_>>(), vec![6]);
        assert!(rows[1].ptm_sites.is_empty() && rows[1].ptm_types.is_empty());
    }

    #[test]
    fn overlap_join_is_inclusive_and_skips_unknown_starts() {
        let rows = annotate(vec![positioned("PEPTIDER", "PEPTIDER", 3)], default_tag_pattern());
        let features = vec![
            feature(10, Some(20)),
            feature(11, Some(20)),
            feature(1, None),
            feature(3, None),
            feature(-1, Some(5)),
        ];
        let overlaps = overlapping_features(&rows, &features);
        let starts: Vec<i64> = overlaps.iter().map(|o| o.feature.start).collect();
        assert_eq!(starts, vec![10, 3]);
    }
}
