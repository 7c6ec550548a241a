use std::collections::HashSet;

use super::maxquant::{import_enclosed, EnclosedColumns};
use super::table::DelimitedTable;
use super::{distinct_values, RawRecord, ResultImporter, SampleFilter};
use crate::error::Result;

const TOOL: &str = "Spectronaut";

pub const PROTEINS: &str = "PEP.AllOccurringProteinAccessions";
pub const MODIFIED_SEQUENCE: &str = "EG.ModifiedSequence";
pub const FILE_NAME: &str = "R.FileName";

/// Spectronaut report importer. Modifications are `[...]` tags.
pub struct Spectronaut;

impl ResultImporter for Spectronaut {
    fn tool(&self) -> &'static str {
        TOOL
    }

    fn matches_signature(&self, columns: &HashSet<&str>) -> bool {
        [PROTEINS, MODIFIED_SEQUENCE, FILE_NAME]
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
                sample: FILE_NAME,
            },
            '[',
            ']',
        )
    }

    fn sample_names(&self, table: &DelimitedTable) -> Result<Vec<String>> {
        distinct_values(table, FILE_NAME)
    }
}
