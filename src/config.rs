use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::import::SampleFilter;
use crate::reference::Organism;
use crate::sequence::DEFAULT_MODIFICATION_PATTERN;

/// Root configuration structure with versioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Configuration schema version for compatibility tracking
    pub version: String,
    /// Storage paths and directories
    #[serde(default)]
    pub storage: StorageConfig,
    /// Reference data selection
    #[serde(default)]
    pub reference: ReferenceConfig,
    /// Result-file import options
    #[serde(default)]
    pub import: ImportConfig,
    /// Performance tuning parameters
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Run directory management
    #[serde(default)]
    pub runs: RunsConfig,
}

/// Storage configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Result file or directory of result files (.csv, .tsv, .txt)
    /// Can be relative to root or absolute
    pub input_path: Option<PathBuf>,
    /// Output Parquet file (single input) or directory (directory input)
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Directory holding `<organism>.fasta` and `preprocessed_uniprot_<organism>.csv`
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
}

/// Reference data configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    /// Organism display name, e.g. "Human"
    #[serde(default = "default_organism")]
    pub organism: String,
}

/// Import configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Run names to keep; empty keeps every row
    #[serde(default)]
    pub samples: Vec<String>,
    /// Files above this size are rejected before parsing
    #[serde(default = "default_max_file_size_gb")]
    pub max_file_size_gb: f64,
    /// Regex matching one modification tag in canonical sequences
    #[serde(default = "default_modification_pattern")]
    pub modification_pattern: String,
}

/// Performance tuning configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Number of rows per RecordBatch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Channel capacity for bounded channel (number of batches in flight)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Zstd compression level (1-22, recommended 1-10)
    #[serde(default = "default_zstd_level")]
    pub zstd_level: u32,
    /// Max row group size in Parquet
    #[serde(default = "default_max_row_group_size")]
    pub max_row_group_size: usize,
    /// Buffer size for reading text inputs (bytes)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

/// Logging configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Run directory configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunsConfig {
    /// Parent directory of the timestamped run directories
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,
    /// Number of most recent runs kept on disk
    #[serde(default = "default_keep_runs")]
    pub keep_runs: usize,
}

// Default value functions
fn default_output_path() -> PathBuf {
    PathBuf::from("data/parquet/peptides.parquet")
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("data/reference")
}

fn default_organism() -> String {
    Organism::Human.name().to_string()
}

fn default_max_file_size_gb() -> f64 {
    50.0
}

fn default_modification_pattern() -> String {
    DEFAULT_MODIFICATION_PATTERN.to_string()
}

fn default_batch_size() -> usize {
    10_000
}

fn default_channel_capacity() -> usize {
    8
}

fn default_zstd_level() -> u32 {
    3
}

fn default_max_row_group_size() -> usize {
    100_000
}

fn default_buffer_size() -> usize {
    256 * 1024 // 256KB
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("runs")
}

fn default_keep_runs() -> usize {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_path: None,
            output_path: default_output_path(),
            reference_dir: default_reference_dir(),
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            organism: default_organism(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            max_file_size_gb: default_max_file_size_gb(),
            modification_pattern: default_modification_pattern(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            channel_capacity: default_channel_capacity(),
            zstd_level: default_zstd_level(),
            max_row_group_size: default_max_row_group_size(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for RunsConfig {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
            keep_runs: default_keep_runs(),
        }
    }
}

/// Command-line values that take precedence over the YAML file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub reference_dir: Option<PathBuf>,
    pub organism: Option<String>,
    pub samples: Vec<String>,
    pub batch_size: Option<usize>,
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings from a YAML file. Falls back to defaults if file is missing.
    /// Fails fast with clear error message if YAML parsing fails.
    pub fn load_from_yaml(config_path: Option<&Path>) -> Result<Self> {
        let path = if let Some(p) = config_path {
            p.to_path_buf()
        } else {
            PathBuf::from("config.yaml")
        };

        // Try to read file; if it doesn't exist, return defaults
        let config_str = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "[INFO] Config file not found at {:?}, using hardcoded defaults",
                    path
                );
                return Ok(Self::default());
            }
            Err(e) => return Err(e).context(format!("Failed to read config file at {:?}", path)),
        };

        let settings = Self::from_yaml_str(&config_str)
            .with_context(|| format!("Failed to parse config.yaml at {:?}", path))?;

        eprintln!(
            "[INFO] Loaded config from {:?} (version: {})",
            path, settings.version
        );
        Ok(settings)
    }

    /// Parses YAML settings; absent sections take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(yaml).context("invalid YAML structure")?;

        // Validate version
        if settings.version != "1.0" {
            eprintln!(
                "[WARN] Config version mismatch: expected 1.0, got {}. Continuing with current schema.",
                settings.version
            );
        }
        Ok(settings)
    }

    /// Merge CLI arguments into settings, with CLI taking precedence
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(input) = cli.input {
            self.storage.input_path = Some(input);
            eprintln!("[INFO] CLI override: input_path");
        }

        if let Some(output) = cli.output {
            self.storage.output_path = output;
            eprintln!("[INFO] CLI override: output_path");
        }

        if let Some(reference_dir) = cli.reference_dir {
            self.storage.reference_dir = reference_dir;
            eprintln!("[INFO] CLI override: reference_dir");
        }

        if let Some(organism) = cli.organism {
            self.reference.organism = organism;
            eprintln!("[INFO] CLI override: organism");
        }

        if !cli.samples.is_empty() {
            self.import.samples = cli.samples;
            eprintln!("[INFO] CLI override: samples");
        }

        if let Some(batch_size) = cli.batch_size {
            self.performance.batch_size = batch_size;
            eprintln!("[INFO] CLI override: batch_size");
        }

        if let Some(log_level) = cli.log_level {
            self.logging.log_level = log_level;
            eprintln!("[INFO] CLI override: log_level");
        }

        self
    }

    /// Resolve paths relative to the project root
    pub fn resolve_paths(&mut self, root: &Path) {
        self.storage.output_path = resolve_path(&self.storage.output_path, root);
        self.storage.reference_dir = resolve_path(&self.storage.reference_dir, root);
        self.runs.runs_dir = resolve_path(&self.runs.runs_dir, root);

        if let Some(ref mut input_path) = self.storage.input_path {
            *input_path = resolve_path(input_path, root);
        }
    }

    /// Get the input path; error if not set
    pub fn input_path(&self) -> Result<&Path> {
        self.storage
            .input_path
            .as_deref()
            .ok_or_else(|| anyhow!("input_path is required (set via --input or config.yaml)"))
    }

    pub fn organism(&self) -> Result<Organism> {
        Ok(self.reference.organism.parse::<Organism>()?)
    }

    pub fn sample_filter(&self) -> SampleFilter {
        SampleFilter::from(self.import.samples.clone())
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        (self.import.max_file_size_gb * 1024.0 * 1024.0 * 1024.0) as u64
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Write the effective settings to `path` as YAML.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize settings")?;
        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config snapshot to {}", path.display()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            storage: StorageConfig::default(),
            reference: ReferenceConfig::default(),
            import: ImportConfig::default(),
            performance: PerformanceConfig::default(),
            logging: LoggingConfig::default(),
            runs: RunsConfig::default(),
        }
    }
}

/// Resolve a path to be either relative to root or return as-is if absolute
fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_takes_defaults() {
        let settings = Settings::from_yaml_str(
            "version: \"1.0\"\nreference:\n  organism: Mouse\nimport:\n  samples: [raw_01]\n",
        )
        .unwrap();
        assert_eq!(settings.organism().unwrap(), Organism::Mouse);
        assert_eq!(settings.import.max_file_size_gb, 50.0);
        assert_eq!(settings.import.modification_pattern, r"\[.*?\]");
        assert!(settings.sample_filter().matches("raw_01"));
        assert!(!settings.sample_filter().matches("raw_02"));
        assert_eq!(settings.performance.batch_size, 10_000);
    }

    #[test]
    fn cli_overrides_win() {
        let settings = Settings::default().merge_with_cli(CliOverrides {
            organism: Some("Rat".into()),
            batch_size: Some(12),
            samples: vec!["wt1".into()],
            ..Default::default()
        });
        assert_eq!(settings.reference.organism, "Rat");
        assert_eq!(settings.performance.batch_size, 12);
        assert_eq!(settings.import.samples, vec!["wt1".to_string()]);
    }

    #[test]
    fn unknown_organism_is_reported() {
        let mut settings = Settings::default();
        settings.reference.organism = "rat".into();
        let err = settings.organism().unwrap_err();
        assert!(err.to_string().starts_with("Organism rat is not available"));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let mut settings = Settings::default();
        settings.storage.input_path = Some(PathBuf::from("inputs/evidence.txt"));
        settings.resolve_paths(Path::new("/work"));
        assert_eq!(
            settings.storage.input_path.as_deref(),
            Some(Path::new("/work/inputs/evidence.txt"))
        );
        assert_eq!(settings.runs.runs_dir, PathBuf::from("/work/runs"));
    }

    #[test]
    fn snapshot_reloads() {
        let path = std::env::temp_dir().join("pepmap_config_snapshot.yaml");
        let mut settings = Settings::default();
        settings.reference.organism = "Mouse".into();
        settings.import.samples = vec!["run1".into()];
        settings.save_snapshot(&path).unwrap();

        let reloaded = Settings::load_from_yaml(Some(&path)).unwrap();
        assert_eq!(reloaded.reference.organism, "Mouse");
        assert_eq!(reloaded.import.samples, vec!["run1".to_string()]);

        let _ = fs::remove_file(path);
    }
}
