use std::io::BufRead;
use std::path::Path;

use super::FeatureAnnotation;
use crate::error::{PipelineError, Result};
use crate::reader::{open_text_reader, DEFAULT_BUFFER_SIZE};

const NOTE_QUALIFIER: &str = "/note=\"";

/// Parses a UniProt text file (`.txt` or `.txt.gz`) into feature rows.
pub fn preprocess_uniprot(path: &Path) -> Result<Vec<FeatureAnnotation>> {
    preprocess_uniprot_buffered(path, DEFAULT_BUFFER_SIZE)
}

pub fn preprocess_uniprot_buffered(path: &Path, buffer_size: usize) -> Result<Vec<FeatureAnnotation>> {
    let reader = open_text_reader(path, buffer_size)?;
    let annotations = parse_flat_file(reader)?;
    log::info!(
        "Preprocessed {} UniProt features from {}",
        annotations.len(),
        path.display()
    );
    Ok(annotations)
}

/// Which multi-line qualifier the parser is inside of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qualifier {
    None,
    Note,
    Other,
}

#[derive(Default)]
struct EntryState {
    protein_id: Option<String>,
    pending: Option<FeatureAnnotation>,
}

impl EntryState {
    fn flush(&mut self, out: &mut Vec<FeatureAnnotation>) {
        if let Some(feature) = self.pending.take() {
            out.push(feature);
        }
    }
}

/// Parses the `AC` and `FT` lines of UniProt flat-file entries.
///
/// The protein id is the first accession of each entry. Multi-line notes are
/// joined with single spaces; other qualifiers are skipped.
pub fn parse_flat_file<R: BufRead>(reader: R) -> Result<Vec<FeatureAnnotation>> {
    let mut annotations = Vec::new();
    let mut state = EntryState::default();
    let mut qualifier = Qualifier::None;

    for line in reader.lines() {
        let line = line?;

        if line.starts_with("//") {
            state.flush(&mut annotations);
            state = EntryState::default();
            qualifier = Qualifier::None;
            continue;
        }

        if let Some(accessions) = line.strip_prefix("AC   ") {
            if state.protein_id.is_none() {
                state.protein_id = accessions
                    .split(';')
                    .map(str::trim)
                    .find(|acc| !acc.is_empty())
                    .map(str::to_string);
            }
            continue;
        }

        let Some(body) = line.strip_prefix("FT") else {
            continue;
        };

        if body.get(3..4).is_some_and(|c| c != " ") {
            state.flush(&mut annotations);
            qualifier = Qualifier::None;
            let protein_id = state.protein_id.clone().unwrap_or_default();
            state.pending = Some(parse_feature_line(&line, &body[3..], protein_id)?);
            continue;
        }

        let text = body.trim();
        match qualifier {
            Qualifier::Note => {
                let (fragment, closed) = strip_closing_quote(text);
                if let Some(feature) = state.pending.as_mut() {
                    if !feature.note.is_empty() && !fragment.is_empty() {
                        feature.note.push(' ');
                    }
                    feature.note.push_str(fragment);
                }
                if closed {
                    qualifier = Qualifier::None;
                }
            }
            Qualifier::Other => {
                if text.ends_with('"') {
                    qualifier = Qualifier::None;
                }
            }
            Qualifier::None => {
                if let Some(value) = text.strip_prefix(NOTE_QUALIFIER) {
                    let (fragment, closed) = strip_closing_quote(value);
                    if let Some(feature) = state.pending.as_mut() {
                        feature.note = fragment.to_string();
                    }
                    if !closed {
                        qualifier = Qualifier::Note;
                    }
                } else if text.starts_with('/') {
                    let opens_quote = text.contains("=\"");
                    if opens_quote && !qualifier_closed(text) {
                        qualifier = Qualifier::Other;
                    }
                }
            }
        }
    }

    state.flush(&mut annotations);
    Ok(annotations)
}

fn strip_closing_quote(text: &str) -> (&str, bool) {
    match text.strip_suffix('"') {
        Some(fragment) => (fragment.trim_end(), true),
        None => (text, false),
    }
}

/// Whether a `/key="value"` qualifier closes on the same line.
fn qualifier_closed(text: &str) -> bool {
    text.split_once("=\"")
        .is_some_and(|(_, value)| value.ends_with('"'))
}

fn parse_feature_line(
    line: &str,
    content: &str,
    protein_id: String,
) -> Result<FeatureAnnotation> {
    let mut parts = content.split_whitespace();
    let invalid = |reason: &str| PipelineError::InvalidFeatureLine {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let feature = parts.next().ok_or_else(|| invalid("missing feature key"))?;
    let location = parts.next().ok_or_else(|| invalid("missing position"))?;
    let (isoform_id, start, end) = extract_positions(location);

    Ok(FeatureAnnotation {
        protein_id,
        feature: feature.to_string(),
        isoform_id,
        start,
        end,
        note: String::new(),
    })
}

/// Splits a location such as `34..65`, `256`, `P35613-2:195..199` into
/// (isoform id, start, optional end).
pub fn extract_positions(location: &str) -> (String, i64, Option<i64>) {
    let (isoform_id, range) = match location.rsplit_once(':') {
        Some((isoform, range)) => (isoform.to_string(), range),
        None => (String::new(), location),
    };

    match range.split_once("..") {
        Some((start, end)) => (
            isoform_id,
            resolve_unclear_position(start),
            Some(resolve_unclear_position(end)),
        ),
        None => (isoform_id, resolve_unclear_position(range), None),
    }
}

/// Resolves UniProt's uncertain positions: `?` is unknown (-1); `<1`, `>117`
/// and `?327` resolve to the stated number.
pub fn resolve_unclear_position(position: &str) -> i64 {
    position
        .trim()
        .trim_start_matches(['<', '>', '?'])
        .parse::<i64>()
        .unwrap_or(-1)
}
