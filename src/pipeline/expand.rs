use crate::import::{extract_uniprot_id, RawRecord};

/// One (accession, peptide) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRecord {
    pub unique_protein_id: String,
    pub all_protein_ids: String,
    pub modified_sequence: String,
    pub naked_sequence: String,
}

/// Explodes each record's accession list into one row per accession.
///
/// Output order is stable: all accessions of record *i* precede those of record
/// *i + 1*, and accessions keep their listed order.
pub fn expand(records: &[RawRecord]) -> Vec<ExpandedRecord> {
    let mut expanded = Vec::with_capacity(records.len());
    for record in records {
        for accession in record.accessions() {
            expanded.push(ExpandedRecord {
                unique_protein_id: extract_uniprot_id(accession).to_string(),
                all_protein_ids: record.all_protein_ids.clone(),
                modified_sequence: record.modified_sequence.clone(),
                naked_sequence: record.naked_sequence.clone(),
            });
        }
    }
    log::debug!("Expanded {} records into {} rows", records.len(), expanded.len());
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_accession_in_order() {
        let records = vec![
            RawRecord::new("A0A024R161;A0A087WT10", "PEPT[Phospho]IDER", "PEPTIDER"),
            RawRecord::new("sp|A0A087WTH5|X_HUMAN", "VIEWER", "VIEWER"),
        ];

        let expanded = expand(&records);
        let accessions: Vec<&str> = expanded
            .iter()
            .map(|r| r.unique_protein_id.as_str())
            .collect();
        assert_eq!(accessions, vec!["A0A024R161", "A0A087WT10", "A0A087WTH5"]);
        assert_eq!(expanded[1].modified_sequence, "PEPT[Phospho]IDER");
        assert_eq!(expanded[1].all_protein_ids, "A0A024R161;A0A087WT10");
    }

    #[test]
    fn row_count_matches_separator_count() {
        let records = vec![
            RawRecord::new("P1;P2;P3", "AAK", "AAK"),
            RawRecord::new("P4", "CCK", "CCK"),
        ];
        let expected: usize = records
            .iter()
            .map(|r| r.all_protein_ids.matches(';').count() + 1)
            .sum();
        assert_eq!(expand(&records).len(), expected);
    }
}
