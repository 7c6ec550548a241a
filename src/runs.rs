//! Run directory lifecycle management.
//!
//! Every invocation gets a timestamped directory holding its log, config
//! snapshot, warnings table and report. Old runs are pruned.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Context for a single mapping run, including directory paths and timing.
pub struct RunContext {
    /// Path to the run directory (e.g., `runs/run_20250118_143022/`)
    pub run_dir: PathBuf,
    /// Unique run identifier (e.g., `run_20250118_143022`)
    pub run_id: String,
    /// UTC timestamp when the run started
    pub start_time: DateTime<Utc>,
}

impl RunContext {
    /// Create a new run context with a timestamped directory.
    ///
    /// Creates `{runs_dir}/run_{YYYYMMDD_HHMMSS}/`; a numeric suffix is added
    /// when two runs start within the same second.
    pub fn new(runs_dir: &Path) -> Result<Self> {
        let start_time = Utc::now();
        let base_id = format!("run_{}", start_time.format("%Y%m%d_%H%M%S"));

        let mut run_id = base_id.clone();
        let mut suffix = 1;
        while runs_dir.join(&run_id).exists() {
            run_id = format!("{base_id}_{suffix}");
            suffix += 1;
        }

        let run_dir = runs_dir.join(&run_id);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create run directory: {}", run_dir.display()))?;

        Ok(Self {
            run_dir,
            run_id,
            start_time,
        })
    }

    /// Path to the report.yaml file within this run directory.
    pub fn report_path(&self) -> PathBuf {
        self.run_dir.join("report.yaml")
    }

    /// Path to the pepmap.log file within this run directory.
    pub fn log_path(&self) -> PathBuf {
        self.run_dir.join("pepmap.log")
    }

    /// Path to the config_snapshot.yaml file within this run directory.
    pub fn config_snapshot_path(&self) -> PathBuf {
        self.run_dir.join("config_snapshot.yaml")
    }

    /// Path to the warnings.tsv table of dropped rows.
    pub fn warnings_path(&self) -> PathBuf {
        self.run_dir.join("warnings.tsv")
    }
}

/// Clean up old run directories, keeping only the most recent `keep_count`.
///
/// Runs are sorted by directory name (which includes timestamp) and older
/// runs beyond `keep_count` are removed.
pub fn cleanup_old_runs(runs_dir: &Path, keep_count: usize) -> Result<()> {
    if !runs_dir.exists() {
        return Ok(());
    }

    let mut run_dirs: Vec<PathBuf> = fs::read_dir(runs_dir)
        .with_context(|| format!("Failed to read runs directory: {}", runs_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("run_"))
        })
        .collect();

    // Sort by name (timestamp order since format is run_YYYYMMDD_HHMMSS)
    run_dirs.sort();

    if run_dirs.len() > keep_count {
        let to_remove = run_dirs.len() - keep_count;
        for dir in run_dirs.into_iter().take(to_remove) {
            match fs::remove_dir_all(&dir) {
                Ok(()) => log::debug!("Removed old run directory {}", dir.display()),
                // Cleanup failures never fail the run
                Err(e) => log::warn!(
                    "Failed to remove old run directory {}: {}",
                    dir.display(),
                    e
                ),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_run_context_creation() {
        let temp_dir = std::env::temp_dir().join("pepmap_test_runs");
        let _ = fs::remove_dir_all(&temp_dir);

        let first = RunContext::new(&temp_dir).unwrap();
        let second = RunContext::new(&temp_dir).unwrap();

        assert!(first.run_dir.exists());
        assert!(first.run_id.starts_with("run_"));
        assert_ne!(first.run_dir, second.run_dir);
        assert!(first.report_path().ends_with("report.yaml"));
        assert!(first.log_path().ends_with("pepmap.log"));
        assert!(first.warnings_path().ends_with("warnings.tsv"));
        assert!(first.config_snapshot_path().ends_with("config_snapshot.yaml"));

        let _ = fs::remove_dir_all(&temp_dir);
    }

    #[test]
    fn test_cleanup_old_runs() {
        let temp_dir = std::env::temp_dir().join("pepmap_test_cleanup");
        let _ = fs::remove_dir_all(&temp_dir);
        fs::create_dir_all(&temp_dir).unwrap();

        for i in 1..=5 {
            let run_dir = temp_dir.join(format!("run_2025010{}_120000", i));
            fs::create_dir_all(&run_dir).unwrap();
            File::create(run_dir.join("report.yaml")).unwrap();
        }
        fs::create_dir_all(temp_dir.join("reference")).unwrap();

        cleanup_old_runs(&temp_dir, 2).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(&temp_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();

        assert_eq!(
            remaining,
            vec!["reference", "run_20250104_120000", "run_20250105_120000"]
        );

        let _ = fs::remove_dir_all(&temp_dir);
    }
}
