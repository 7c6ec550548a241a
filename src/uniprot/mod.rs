//! UniProt feature annotations: flat-file preprocessing, the preprocessed CSV
//! table and the selectable feature categories.

pub mod features;
pub mod flatfile;

use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::reader::{open_text_reader, DEFAULT_BUFFER_SIZE};

pub use features::{format_features, FeatureCategory, FormattedFeature, FEATURE_CATEGORIES};
pub use flatfile::{
    parse_flat_file, preprocess_uniprot, preprocess_uniprot_buffered, resolve_unclear_position,
};

/// One annotated region of a protein.
///
/// `start` is -1 when UniProt reports the position as unknown; `end` is absent
/// for single-residue features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnnotation {
    pub protein_id: String,
    pub feature: String,
    #[serde(default)]
    pub isoform_id: String,
    #[serde(deserialize_with = "de_coordinate")]
    pub start: i64,
    #[serde(default, deserialize_with = "de_optional_coordinate")]
    pub end: Option<i64>,
    #[serde(default)]
    pub note: String,
}

impl FeatureAnnotation {
    /// The inclusive residue span, or `None` when the position is unknown.
    pub fn span(&self) -> Option<(i64, i64)> {
        if self.start < 0 {
            return None;
        }
        let end = self.end.filter(|end| *end >= 0).unwrap_or(self.start);
        Some((self.start, end.max(self.start)))
    }

    /// Inclusive-inclusive overlap with a 1-based peptide span.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.span()
            .is_some_and(|(f_start, f_end)| f_start <= end && f_end >= start)
    }
}

/// Accepts integer or float-formatted coordinates (`14`, `14.0`).
fn parse_coordinate(raw: &str) -> std::result::Result<Option<i64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Some(value));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.fract() == 0.0)
        .map(|value| Some(value as i64))
        .ok_or_else(|| format!("invalid coordinate '{raw}'"))
}

fn de_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_coordinate(&raw)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("missing start coordinate"))
}

fn de_optional_coordinate<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<i64>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        Some(raw) => parse_coordinate(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Reads a preprocessed annotation table
/// (`protein_id,feature,isoform_id,start,end,note`).
pub fn read_annotations(path: &Path) -> Result<Vec<FeatureAnnotation>> {
    read_annotations_buffered(path, DEFAULT_BUFFER_SIZE)
}

/// [`read_annotations`] through a read buffer of `buffer_size` bytes.
pub fn read_annotations_buffered(path: &Path, buffer_size: usize) -> Result<Vec<FeatureAnnotation>> {
    let reader = open_text_reader(path, buffer_size)?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let annotations = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<FeatureAnnotation>, _>>()?;
    log::info!(
        "Loaded {} feature annotations from {}",
        annotations.len(),
        path.display()
    );
    Ok(annotations)
}

/// Writes an annotation table in the layout read by [`read_annotations`].
pub fn write_annotations(path: &Path, annotations: &[FeatureAnnotation]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for annotation in annotations {
        writer.serialize(annotation)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))?
        .flush()?;
    Ok(())
}
