use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

/// Creates the Arrow schema for mapped peptides.
///
/// Top-level columns:
/// - unique_protein_id: Utf8 (single accession the row is positioned on)
/// - all_protein_ids: Utf8 (`;`-joined accessions of the identification)
/// - modified_sequence / naked_sequence: Utf8
/// - start / end: Int32 (1-based, inclusive)
/// - source_file: Utf8
///
/// Nested columns:
/// - ptm_sites: List<Int32> (0-based offsets within the peptide)
/// - ptm_types: List<Utf8>
pub fn create_peptide_schema() -> Schema {
    Schema::new(vec![
        Field::new("unique_protein_id", DataType::Utf8, false),
        Field::new("all_protein_ids", DataType::Utf8, false),
        Field::new("modified_sequence", DataType::Utf8, false),
        Field::new("naked_sequence", DataType::Utf8, false),
        Field::new("start", DataType::Int32, false),
        Field::new("end", DataType::Int32, false),
        Field::new("ptm_sites", ptm_sites_list_type(), false),
        Field::new("ptm_types", ptm_types_list_type(), false),
        Field::new("source_file", DataType::Utf8, true),
    ])
}

/// Returns the Arc<Schema> for use with Arrow writers
pub fn schema_ref() -> Arc<Schema> {
    Arc::new(create_peptide_schema())
}

fn ptm_sites_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Int32, true)))
}

fn ptm_types_list_type() -> DataType {
    DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_order_is_stable() {
        let schema = create_peptide_schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "unique_protein_id",
                "all_protein_ids",
                "modified_sequence",
                "naked_sequence",
                "start",
                "end",
                "ptm_sites",
                "ptm_types",
                "source_file",
            ]
        );
    }
}
