//! Maps peptide identifications from proteomics search engines onto reference
//! protein sequences, extracts PTM sites and joins UniProt feature annotations.
//!
//! Pipeline: Import → Expand → Resolve → Annotate. The batch driver in
//! `main.rs` writes the annotated table to Parquet.

pub mod cleavage;
pub mod config;
pub mod error;
pub mod fasta;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reader;
pub mod reference;
pub mod report;
pub mod runs;
pub mod schema;
pub mod sequence;
pub mod uniprot;
pub mod view;
pub mod writer;

pub use error::{PipelineError, Result};
