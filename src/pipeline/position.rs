use super::expand::ExpandedRecord;
use super::{PipelineWarning, WithWarnings};
use crate::fasta::SequenceDatabase;

/// An expanded row located on its protein, 1-based inclusive coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedRecord {
    pub unique_protein_id: String,
    pub all_protein_ids: String,
    pub modified_sequence: String,
    pub naked_sequence: String,
    pub start: usize,
    pub end: usize,
}

/// Returns the 1-based inclusive span of the first exact occurrence of `peptide`.
pub fn locate(protein_sequence: &str, peptide: &str) -> Option<(usize, usize)> {
    if peptide.is_empty() {
        return None;
    }
    protein_sequence
        .find(peptide)
        .map(|offset| (offset + 1, offset + peptide.len()))
}

/// Resolves every row against the reference. Rows whose accession is unknown or
/// whose peptide does not occur in the protein are dropped with a warning.
pub fn resolve(
    records: Vec<ExpandedRecord>,
    reference: &SequenceDatabase,
) -> WithWarnings<Vec<PositionedRecord>> {
    let mut positioned = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();

    for record in records {
        let Some(protein_sequence) = reference.sequence(&record.unique_protein_id) else {
            warnings.push(PipelineWarning::NoReferenceEntry {
                accession: record.unique_protein_id,
            });
            continue;
        };

        let Some((start, end)) = locate(protein_sequence, &record.naked_sequence) else {
            warnings.push(PipelineWarning::SequenceNotMatched {
                sequence: record.naked_sequence,
                accession: record.unique_protein_id,
            });
            continue;
        };

        positioned.push(PositionedRecord {
            unique_protein_id: record.unique_protein_id,
            all_protein_ids: record.all_protein_ids,
            modified_sequence: record.modified_sequence,
            naked_sequence: record.naked_sequence,
            start,
            end,
        });
    }

    for warning in &warnings {
        log::warn!("{warning}");
    }
    log::debug!(
        "Positioned {} rows, dropped {}",
        positioned.len(),
        warnings.len()
    );

    WithWarnings::new(positioned, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(accession: &str, sequence: &str) -> ExpandedRecord {
        ExpandedRecord {
            unique_protein_id: accession.into(),
            all_protein_ids: accession.into(),
            modified_sequence: sequence.into(),
            naked_sequence: sequence.into(),
        }
    }

    #[test]
    fn locate_is_one_based_inclusive_first_hit() {
        assert_eq!(locate("MKPEPTIDERPEPTIDER", "PEPTIDER"), Some((3, 10)));
        assert_eq!(locate("MKPEPTIDER", "NONSEQ"), None);
        assert_eq!(locate("MKPEPTIDER", ""), None);
        assert_eq!(locate("MKPEPTIDER", "peptider"), None);
    }

    #[test]
    fn unmatched_rows_become_warnings() {
        let reference: SequenceDatabase =
            [("P1", "MKPEPTIDERGG"), ("P2", "MSEQUENCER")].into_iter().collect();
        let result = resolve(
            vec![
                expanded("P1", "PEPTIDER"),
                expanded("P1", "NONSEQ"),
                expanded("Nonsense", "PEPTIDER"),
                expanded("P2", "SEQUENCER"),
            ],
            &reference,
        );

        let spans: Vec<(usize, usize)> = result.value.iter().map(|r| (r.start, r.end)).collect();
        assert_eq!(spans, vec![(3, 10), (2, 10)]);
        let messages: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Peptide sequence NONSEQ could not be matched",
                "No matching entry for Nonsense",
            ]
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let reference: SequenceDatabase = [("P1", "AKAKAK")].into_iter().collect();
        let first = resolve(vec![expanded("P1", "AK")], &reference);
        let second = resolve(vec![expanded("P1", "AK")], &reference);
        assert_eq!(first.value, second.value);
        assert_eq!((first.value[0].start, first.value[0].end), (1, 2));
    }
}
