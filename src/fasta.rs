use regex::Regex;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::Result;
use crate::reader::{open_text_reader, DEFAULT_BUFFER_SIZE};

static DESCRIPTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)([A-Z]{2})=").expect("static pattern is valid"));

/// Parsed UniProt FASTA header, e.g.
/// `sp|P02769|ALBU_BOVIN Albumin OS=Bos taurus OX=9913 GN=ALB PE=1 SV=4`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProteinDescription {
    pub db: String,
    pub id: String,
    pub entry: String,
    pub name: String,
    pub taxon: String,
    pub organism: Option<String>,
    pub taxon_id: Option<String>,
    pub gene: Option<String>,
    pub existence: Option<String>,
    pub version: Option<String>,
}

impl ProteinDescription {
    pub fn parse(header: &str) -> Self {
        let header = header.trim_start_matches('>').trim();
        let (first_token, rest) = header
            .split_once(char::is_whitespace)
            .unwrap_or((header, ""));

        let mut description = ProteinDescription {
            id: parse_fasta_key(first_token),
            ..Default::default()
        };

        let parts: Vec<&str> = first_token.split('|').collect();
        if let [db, _, entry, ..] = parts.as_slice() {
            description.db = db.to_string();
            description.entry = entry.to_string();
            description.taxon = entry
                .split_once('_')
                .map(|(_, taxon)| taxon.to_string())
                .unwrap_or_default();
        }

        let keys: Vec<(usize, usize, &str)> = DESCRIPTION_KEY
            .captures_iter(rest)
            .filter_map(|c| {
                let whole = c.get(0)?;
                let key = c.get(1)?;
                Some((whole.start(), whole.end(), key.as_str()))
            })
            .collect();

        let name_end = keys.first().map_or(rest.len(), |(start, _, _)| *start);
        description.name = rest[..name_end].trim().to_string();

        for (i, (_, value_start, key)) in keys.iter().enumerate() {
            let value_end = keys.get(i + 1).map_or(rest.len(), |(start, _, _)| *start);
            let value = rest[*value_start..value_end].trim().to_string();
            match *key {
                "OS" => description.organism = Some(value),
                "OX" => description.taxon_id = Some(value),
                "GN" => description.gene = Some(value),
                "PE" => description.existence = Some(value),
                "SV" => description.version = Some(value),
                _ => {}
            }
        }

        description
    }

    /// Looks up a description field by its UniProt/FASTA key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            "db" => Some(self.db.as_str()),
            "id" => Some(self.id.as_str()),
            "entry" => Some(self.entry.as_str()),
            "name" => Some(self.name.as_str()),
            "taxon" => Some(self.taxon.as_str()),
            "OS" => self.organism.as_deref(),
            "OX" => self.taxon_id.as_deref(),
            "GN" => self.gene.as_deref(),
            "PE" => self.existence.as_deref(),
            "SV" => self.version.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }
}

/// One protein of the reference database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub accession: String,
    pub sequence: String,
    pub description: ProteinDescription,
}

/// Protein sequences in file order, indexed by accession.
#[derive(Debug, Clone, Default)]
pub struct SequenceDatabase {
    entries: Vec<ReferenceSequence>,
    index: HashMap<String, usize>,
}

impl SequenceDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a (optionally gzipped) FASTA file.
    ///
    /// Header parsing:
    /// - If header is like `>sp|P04637-2|...`, the accession is `P04637-2`.
    /// - Otherwise the accession is the first token after `>` up to whitespace.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_buffered(path, DEFAULT_BUFFER_SIZE)
    }

    /// [`SequenceDatabase::load`] through a read buffer of `buffer_size` bytes.
    pub fn load_buffered(path: &Path, buffer_size: usize) -> Result<Self> {
        let reader = open_text_reader(path, buffer_size)?;
        let mut database = Self::new();

        let mut current_header: Option<String> = None;
        let mut current_seq = String::new();

        for line in reader.lines() {
            let line = line?;
            if let Some(header) = line.strip_prefix('>') {
                if let Some(previous) = current_header.take() {
                    database.push_fasta(&previous, std::mem::take(&mut current_seq));
                }
                current_header = Some(header.trim().to_string());
            } else {
                let part = line.trim();
                if !part.is_empty() {
                    current_seq.push_str(part);
                }
            }
        }

        if let Some(previous) = current_header.take() {
            database.push_fasta(&previous, current_seq);
        }

        log::info!(
            "Loaded {} reference sequences from {}",
            database.len(),
            path.display()
        );
        Ok(database)
    }

    fn push_fasta(&mut self, header: &str, sequence: String) {
        let description = ProteinDescription::parse(header);
        self.insert(ReferenceSequence {
            accession: description.id.clone(),
            sequence,
            description,
        });
    }

    /// Adds an entry. A repeated accession keeps its first sequence.
    pub fn insert(&mut self, entry: ReferenceSequence) {
        if self.index.contains_key(&entry.accession) {
            log::debug!("Duplicate FASTA accession {} ignored", entry.accession);
            return;
        }
        self.index.insert(entry.accession.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn get(&self, accession: &str) -> Option<&ReferenceSequence> {
        self.index.get(accession).map(|&i| &self.entries[i])
    }

    pub fn sequence(&self, accession: &str) -> Option<&str> {
        self.get(accession).map(|entry| entry.sequence.as_str())
    }

    pub fn contains(&self, accession: &str) -> bool {
        self.index.contains_key(accession)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceSequence> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ReferenceSequence> for SequenceDatabase {
    fn from_iter<I: IntoIterator<Item = ReferenceSequence>>(iter: I) -> Self {
        let mut database = Self::new();
        for entry in iter {
            database.insert(entry);
        }
        database
    }
}

impl<A: Into<String>, S: Into<String>> FromIterator<(A, S)> for SequenceDatabase {
    /// Builds a database from bare (accession, sequence) pairs.
    fn from_iter<I: IntoIterator<Item = (A, S)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(accession, sequence)| {
                let accession = accession.into();
                ReferenceSequence {
                    description: ProteinDescription {
                        id: accession.clone(),
                        ..Default::default()
                    },
                    accession,
                    sequence: sequence.into(),
                }
            })
            .collect()
    }
}

fn parse_fasta_key(first_token: &str) -> String {
    // Prefer UniProt pipe format.
    // Examples: `sp|P04637-2|...`, `tr|Q9TEST-1|...`
    let mut parts = first_token.split('|');
    let p0 = parts.next();
    let p1 = parts.next();
    let p2 = parts.next();

    match (p0, p1, p2) {
        (Some(_db), Some(acc), Some(_rest)) if !acc.is_empty() => acc.to_string(),
        _ => first_token.to_string(),
    }
}
