//! Reference data per organism: protein sequences and feature annotations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PipelineError, Result};
use crate::fasta::SequenceDatabase;
use crate::reader::DEFAULT_BUFFER_SIZE;
use crate::uniprot::{preprocess_uniprot_buffered, read_annotations_buffered, FeatureAnnotation};

/// Organisms with bundled reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organism {
    Human,
    Mouse,
    Rat,
    Cow,
    Zebrafish,
    Drosophila,
    CElegans,
    SlimeMold,
    ArabidopsisThaliana,
    Rice,
    EscherichiaColi,
    BacillusSubtilis,
    SaccharomycesCerevisiae,
    SarsCov,
    SarsCov2,
}

impl Organism {
    pub const ALL: [Organism; 15] = [
        Organism::Human,
        Organism::Mouse,
        Organism::Rat,
        Organism::Cow,
        Organism::Zebrafish,
        Organism::Drosophila,
        Organism::CElegans,
        Organism::SlimeMold,
        Organism::ArabidopsisThaliana,
        Organism::Rice,
        Organism::EscherichiaColi,
        Organism::BacillusSubtilis,
        Organism::SaccharomycesCerevisiae,
        Organism::SarsCov,
        Organism::SarsCov2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Organism::Human => "Human",
            Organism::Mouse => "Mouse",
            Organism::Rat => "Rat",
            Organism::Cow => "Cow",
            Organism::Zebrafish => "Zebrafish",
            Organism::Drosophila => "Drosophila",
            Organism::CElegans => "Caenorhabditis elegans",
            Organism::SlimeMold => "Slime mold",
            Organism::ArabidopsisThaliana => "Arabidopsis thaliana",
            Organism::Rice => "Rice",
            Organism::EscherichiaColi => "Escherichia coli",
            Organism::BacillusSubtilis => "Bacillus subtilis",
            Organism::SaccharomycesCerevisiae => "Saccharomyces cerevisiae",
            Organism::SarsCov => "SARS-CoV",
            Organism::SarsCov2 => "SARS-CoV2",
        }
    }

    /// File stem of the organism's reference files.
    pub fn file_stem(self) -> &'static str {
        match self {
            Organism::Human => "human",
            Organism::Mouse => "mouse",
            Organism::Rat => "rat",
            Organism::Cow => "bovine",
            Organism::Zebrafish => "zebrafish",
            Organism::Drosophila => "drosophila",
            Organism::CElegans => "c_elegans",
            Organism::SlimeMold => "slime_mold",
            Organism::ArabidopsisThaliana => "arabidopsis_thaliana",
            Organism::Rice => "rice",
            Organism::EscherichiaColi => "ecoli",
            Organism::BacillusSubtilis => "bacillus_subtilis",
            Organism::SaccharomycesCerevisiae => "saccharomyces_cerevisiae",
            Organism::SarsCov => "sars_cov",
            Organism::SarsCov2 => "sars_cov2",
        }
    }

    fn available() -> String {
        let names: Vec<String> = Self::ALL
            .iter()
            .map(|organism| format!("'{}'", organism.name()))
            .collect();
        format!("[{}]", names.join(", "))
    }
}

impl FromStr for Organism {
    type Err = PipelineError;

    /// Exact, case-sensitive match on the display name.
    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|organism| organism.name() == name)
            .ok_or_else(|| PipelineError::UnknownOrganism {
                name: name.to_string(),
                available: Self::available(),
            })
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Supplies reference data for an organism.
pub trait ReferenceProvider {
    fn get_sequences(&self, organism: Organism) -> Result<SequenceDatabase>;
    fn get_annotations(&self, organism: Organism) -> Result<Vec<FeatureAnnotation>>;

    /// Loads both tables into an immutable context.
    fn load_context(&self, organism: Organism) -> Result<ReferenceContext> {
        Ok(ReferenceContext {
            organism,
            sequences: self.get_sequences(organism)?,
            annotations: self.get_annotations(organism)?,
        })
    }
}

/// Reference files in a local directory:
/// `<stem>.fasta[.gz]` and `preprocessed_uniprot_<stem>.csv[.gz]`, falling back to
/// preprocessing `<stem>.txt[.gz]` when no CSV table exists.
#[derive(Debug, Clone)]
pub struct LocalReferenceStore {
    root: PathBuf,
    buffer_size: usize,
}

impl LocalReferenceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Read buffer size for the reference files, in bytes.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the first candidate that exists, or the first candidate.
    fn find(&self, names: &[String]) -> PathBuf {
        names
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| self.root.join(&names[0]))
    }

    fn candidates(base: &str) -> Vec<String> {
        vec![base.to_string(), format!("{base}.gz")]
    }
}

impl ReferenceProvider for LocalReferenceStore {
    fn get_sequences(&self, organism: Organism) -> Result<SequenceDatabase> {
        let path = self.find(&Self::candidates(&format!("{}.fasta", organism.file_stem())));
        SequenceDatabase::load_buffered(&path, self.buffer_size)
    }

    fn get_annotations(&self, organism: Organism) -> Result<Vec<FeatureAnnotation>> {
        let stem = organism.file_stem();
        let table = self.find(&Self::candidates(&format!("preprocessed_uniprot_{stem}.csv")));
        if table.exists() {
            return read_annotations_buffered(&table, self.buffer_size);
        }

        let flat_file = self.find(&Self::candidates(&format!("{stem}.txt")));
        if flat_file.exists() {
            log::info!(
                "No preprocessed annotation table for {organism}; parsing {}",
                flat_file.display()
            );
            return preprocess_uniprot_buffered(&flat_file, self.buffer_size);
        }

        Err(PipelineError::FileNotFound { path: table })
    }
}

/// Sequences and annotations of one organism, loaded once and shared read-only
/// by every pipeline run.
#[derive(Debug, Clone)]
pub struct ReferenceContext {
    pub organism: Organism,
    pub sequences: SequenceDatabase,
    pub annotations: Vec<FeatureAnnotation>,
}

impl ReferenceContext {
    pub fn new(
        organism: Organism,
        sequences: SequenceDatabase,
        annotations: Vec<FeatureAnnotation>,
    ) -> Self {
        Self {
            organism,
            sequences,
            annotations,
        }
    }

    /// Annotations of one protein.
    pub fn annotations_for<'a>(
        &'a self,
        accession: &'a str,
    ) -> impl Iterator<Item = &'a FeatureAnnotation> + 'a {
        self.annotations
            .iter()
            .filter(move |a| a.protein_id == accession)
    }
}
