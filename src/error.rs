use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid modification pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Channel send error")]
    ChannelSend,

    #[error("The selected file is not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(
        "File {} is {size_bytes} bytes, which exceeds the limit of {limit_bytes} bytes",
        path.display()
    )]
    FileTooLarge {
        path: PathBuf,
        size_bytes: u64,
        limit_bytes: u64,
    },

    #[error(
        "The columns necessary for {tool} import cannot be extracted from {}: missing {}",
        path.display(),
        missing.join(", ")
    )]
    MissingColumns {
        tool: &'static str,
        missing: Vec<String>,
        path: PathBuf,
    },

    #[error("Input data format for {} not known.", path.display())]
    UnrecognizedFormat { path: PathBuf },

    #[error("A column with the raw file names is not in the file {}.", path.display())]
    MissingSampleColumn { path: PathBuf },

    #[error("Unknown {tool} modification '{token}' on residue '{residue}' in {sequence}")]
    UnknownModification {
        tool: &'static str,
        token: String,
        residue: String,
        sequence: String,
    },

    #[error("Malformed {tool} sequence {sequence}: {reason}")]
    MalformedSequence {
        tool: &'static str,
        sequence: String,
        reason: String,
    },

    #[error("Organism {name} is not available. Please select one of the following: {available}")]
    UnknownOrganism { name: String, available: String },

    #[error("Protease {name} is not known")]
    UnknownProtease { name: String },

    #[error("No reference entry for accession {accession}")]
    UnknownAccession { accession: String },

    #[error("Invalid UniProt feature line '{line}': {reason}")]
    InvalidFeatureLine { line: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
