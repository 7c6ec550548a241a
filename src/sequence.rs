//! Canonical peptide notation.
//!
//! A modification directly follows the residue it modifies as `[Name (Context)]`.
//! Terminal modifications sit before the first / after the last residue and use the
//! `N-term` / `C-term` context labels. Every importer produces this notation and every
//! downstream stage consumes it.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Default pattern matching one canonical modification tag.
pub const DEFAULT_MODIFICATION_PATTERN: &str = r"\[.*?\]";

static DEFAULT_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_MODIFICATION_PATTERN).expect("static pattern is valid"));

pub fn default_tag_pattern() -> &'static Regex {
    &DEFAULT_TAG_REGEX
}

/// Removes every modification tag, leaving the bare residue string.
pub fn strip_tags(modified_sequence: &str) -> String {
    strip_tags_with(modified_sequence, default_tag_pattern())
}

pub fn strip_tags_with(modified_sequence: &str, tag_pattern: &Regex) -> String {
    tag_pattern.replace_all(modified_sequence, "").into_owned()
}

/// Computes the residue offset and label of every tag in `modified_sequence`.
///
/// Offsets are 0-based into the stripped sequence. A tag belongs to the residue
/// immediately before it; a leading tag (N-terminal) belongs to offset 0.
/// Sequences without tags yield two empty vectors.
pub fn extract_sites(modified_sequence: &str, tag_pattern: &Regex) -> (Vec<usize>, Vec<String>) {
    let mut sites = Vec::new();
    let mut labels = Vec::new();
    let mut removed = 0usize;

    for tag in tag_pattern.find_iter(modified_sequence) {
        let stripped_offset = tag.start() - removed;
        sites.push(stripped_offset.saturating_sub(1));
        labels.push(tag.as_str().to_string());
        removed += tag.len();
    }

    (sites, labels)
}

/// Rewrites protein-terminal context labels to the canonical terminal labels.
pub fn canonical_label(label: &str) -> String {
    label
        .replace("(Protein N-term)", "(N-term)")
        .replace("(Protein C-term)", "(C-term)")
}

/// A peptide under construction in canonical notation.
///
/// Normalizers push residues left to right and attach modification labels; the
/// `Display` impl renders `[N-term mods]R[mod]...R[mod][C-term mods]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CanonicalPeptide {
    n_term: Vec<String>,
    residues: Vec<(char, Vec<String>)>,
    c_term: Vec<String>,
}

impl CanonicalPeptide {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unmodified peptide from a bare residue string.
    pub fn from_bare(sequence: &str) -> Self {
        let mut peptide = Self::new();
        for residue in sequence.chars() {
            peptide.push_residue(residue);
        }
        peptide
    }

    pub fn push_residue(&mut self, residue: char) {
        self.residues.push((residue, Vec::new()));
    }

    /// Attaches a label to the most recently pushed residue, or to the N-terminus
    /// when no residue has been pushed yet.
    pub fn modify_last(&mut self, label: impl Into<String>) {
        match self.residues.last_mut() {
            Some((_, mods)) => mods.push(label.into()),
            None => self.n_term.push(label.into()),
        }
    }

    /// Attaches a label to the residue at a 0-based index. Returns false when out of range.
    pub fn modify_at(&mut self, index: usize, label: impl Into<String>) -> bool {
        match self.residues.get_mut(index) {
            Some((_, mods)) => {
                mods.push(label.into());
                true
            }
            None => false,
        }
    }

    pub fn modify_n_term(&mut self, label: impl Into<String>) {
        self.n_term.push(label.into());
    }

    pub fn modify_c_term(&mut self, label: impl Into<String>) {
        self.c_term.push(label.into());
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn last_residue(&self) -> Option<char> {
        self.residues.last().map(|(residue, _)| *residue)
    }

    pub fn bare(&self) -> String {
        self.residues.iter().map(|(residue, _)| *residue).collect()
    }
}

impl fmt::Display for CanonicalPeptide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.n_term {
            write!(f, "[{label}]")?;
        }
        for (residue, mods) in &self.residues {
            write!(f, "{residue}")?;
            for label in mods {
                write!(f, "[{label}]")?;
            }
        }
        for label in &self.c_term {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

/// One lexical element of an inline-annotated sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineToken {
    Residue(char),
    Tag(String),
}

/// Splits a sequence with enclosed inline tags (e.g. `M(Oxidation (M))` or
/// `M[Oxidation (M)]`) into residues and tag bodies. Nested delimiters inside a
/// tag are kept as part of its body.
pub fn tokenize_enclosed(
    sequence: &str,
    open: char,
    close: char,
) -> std::result::Result<Vec<InlineToken>, String> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut body = String::new();

    for c in sequence.chars() {
        if c == open {
            if depth > 0 {
                body.push(c);
            }
            depth += 1;
        } else if c == close {
            match depth {
                0 => return Err(format!("unexpected '{close}'")),
                1 => {
                    depth = 0;
                    tokens.push(InlineToken::Tag(std::mem::take(&mut body)));
                }
                _ => {
                    depth -= 1;
                    body.push(c);
                }
            }
        } else if depth > 0 {
            body.push(c);
        } else if c.is_ascii_uppercase() {
            tokens.push(InlineToken::Residue(c));
        } else {
            return Err(format!("unexpected character '{c}' outside a modification"));
        }
    }

    if depth > 0 {
        return Err(format!("unterminated '{open}'"));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sites_follow_preceding_residue() {
        let (sites, labels) = extract_sites("PEPT[Phospho]IDE[GlyGly (K)]R", default_tag_pattern());
        assert_eq!(sites, vec![3, 6]);
        assert_eq!(labels, vec!["[Phospho]", "[GlyGly (K)]"]);
    }

    #[test]
    fn leading_tag_maps_to_first_residue() {
        let (sites, _) = extract_sites("[Ac]PEPTIDE[GlyGly (K)]R", default_tag_pattern());
        assert_eq!(sites, vec![0, 6]);
    }

    #[test]
    fn untagged_sequence_has_no_sites() {
        let (sites, labels) = extract_sites("VIEWER", default_tag_pattern());
        assert!(sites.is_empty());
        assert!(labels.is_empty());
        assert_eq!(strip_tags("VIEWER"), "VIEWER");
    }

    #[test]
    fn strip_removes_all_tags() {
        assert_eq!(
            strip_tags("[Acetyl (N-term)]SEQ[GlyGly (K)]UENCE[GlyGly (K)]R"),
            "SEQUENCER"
        );
    }

    #[test]
    fn canonical_peptide_renders_terminal_mods() {
        let mut peptide = CanonicalPeptide::from_bare("MPEK");
        peptide.modify_n_term("Acetyl (N-term)");
        assert!(peptide.modify_at(0, "Oxidation (M)"));
        peptide.modify_c_term("Amidated (C-term)");
        assert!(!peptide.modify_at(4, "Oxidation (M)"));
        assert_eq!(
            peptide.to_string(),
            "[Acetyl (N-term)]M[Oxidation (M)]PEK[Amidated (C-term)]"
        );
        assert_eq!(peptide.bare(), "MPEK");
    }

    #[test]
    fn tokenizer_keeps_nested_parentheses() {
        let tokens = tokenize_enclosed("(Acetyl (Protein N-term))M(Oxidation (M))K", '(', ')')
            .unwrap();
        assert_eq!(
            tokens,
            vec![
                InlineToken::Tag("Acetyl (Protein N-term)".to_string()),
                InlineToken::Residue('M'),
                InlineToken::Tag("Oxidation (M)".to_string()),
                InlineToken::Residue('K'),
            ]
        );
        assert!(tokenize_enclosed("M(Oxidation (M)K", '(', ')').is_err());
        assert!(tokenize_enclosed("Mx", '(', ')').is_err());
    }

    #[test]
    fn protein_terminal_context_is_canonicalised() {
        assert_eq!(canonical_label("Acetyl (Protein N-term)"), "Acetyl (N-term)");
        assert_eq!(canonical_label("Oxidation (M)"), "Oxidation (M)");
    }
}
