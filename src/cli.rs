use clap::Parser;
use std::path::PathBuf;

use pepmap::config::CliOverrides;

#[derive(Parser, Debug)]
#[command(name = "pepmap")]
#[command(about = "Map proteomics search-engine results onto reference proteins and write Apache Parquet")]
#[command(version)]
pub struct Args {
    /// Path to config YAML file (default: config.yaml in root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Result file (MaxQuant, Spectronaut, AlphaPept, DIA-NN, FragPipe) or a directory of them
    /// Overrides config.yaml value if provided
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output Parquet file, or output directory when the input is a directory
    /// Overrides config.yaml value if provided
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory holding the organism FASTA and annotation files
    #[arg(short, long)]
    pub reference_dir: Option<PathBuf>,

    /// Organism of the study, e.g. "Human" or "Escherichia coli"
    #[arg(long)]
    pub organism: Option<String>,

    /// Run/sample names to keep (repeatable); all rows when omitted
    #[arg(short, long = "sample")]
    pub samples: Vec<String>,

    /// Batch size (number of rows per RecordBatch)
    /// Overrides config.yaml value if provided
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Print the run names found in the input file and exit
    #[arg(long)]
    pub list_samples: bool,
}

impl Args {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            input: self.input.clone(),
            output: self.output.clone(),
            reference_dir: self.reference_dir.clone(),
            organism: self.organism.clone(),
            samples: self.samples.clone(),
            batch_size: self.batch_size,
            log_level: self.log_level.clone(),
        }
    }
}
