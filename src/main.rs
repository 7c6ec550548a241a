mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use pepmap::config::Settings;
use pepmap::import::{detect_format, sample_names};
use pepmap::logging;
use pepmap::metrics::{LocalMetrics, Metrics};
use pepmap::pipeline::batcher::Batcher;
use pepmap::pipeline::{process_file_as, PipelineWarning};
use pepmap::reader::check_file_size;
use pepmap::reference::{LocalReferenceStore, ReferenceContext, ReferenceProvider};
use pepmap::report::{FileSummary, RunReport, RunStatus};
use pepmap::runs::{cleanup_old_runs, RunContext};
use pepmap::writer::parquet::write_batches;

use crate::cli::Args;

/// Extensions picked up in directory mode (plain or gzipped).
const INPUT_PATTERNS: [&str; 6] = ["*.csv", "*.tsv", "*.txt", "*.csv.gz", "*.tsv.gz", "*.txt.gz"];

fn main() -> Result<()> {
    let args = Args::parse();

    // Load settings from YAML, with CLI overrides
    let mut settings =
        Settings::load_from_yaml(args.config.as_deref())?.merge_with_cli(args.overrides());

    // Resolve paths relative to current working directory (project root)
    let root = env::current_dir()?;
    settings.resolve_paths(&root);

    if args.list_samples {
        for name in sample_names(settings.input_path()?)? {
            println!("{name}");
        }
        return Ok(());
    }

    let run_context = RunContext::new(&settings.runs.runs_dir)?;
    logging::init(Some(&run_context.log_path()), settings.log_level())?;

    log::info!("Run ID: {}", run_context.run_id);
    log::info!("Run directory: {}", run_context.run_dir.display());

    settings.save_snapshot(&run_context.config_snapshot_path())?;
    log::info!(
        "Config snapshot saved to {}",
        run_context.config_snapshot_path().display()
    );

    log::info!("Configuration ready");
    log::info!("  Input: {}", settings.input_path()?.display());
    log::info!("  Output: {}", settings.storage.output_path.display());
    log::info!("  Reference: {}", settings.storage.reference_dir.display());
    log::info!("  Organism: {}", settings.reference.organism);
    if settings.import.samples.is_empty() {
        log::info!("  Samples: all");
    } else {
        log::info!("  Samples: {}", settings.import.samples.join(", "));
    }
    log::info!("  Batch size: {}", settings.performance.batch_size);
    log::info!("  Channel capacity: {}", settings.performance.channel_capacity);

    let metrics = Metrics::new();

    // Terminal spinner that updates from Metrics
    let progress_running = Arc::new(AtomicBool::new(true));
    let progress_flag = Arc::clone(&progress_running);
    let progress_metrics = metrics.clone();
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("[{spinner}] {msg}")?);
    pb.enable_steady_tick(std::time::Duration::from_millis(200));
    let progress_handle = thread::spawn(move || {
        while progress_flag.load(Ordering::Relaxed) {
            pb.set_message(format!(
                "files: {} done / {} failed | rows: {} imported, {} positioned | warnings: {}",
                progress_metrics.files_processed(),
                progress_metrics.files_failed(),
                progress_metrics.rows_imported(),
                progress_metrics.rows_positioned(),
                progress_metrics.warnings_no_entry() + progress_metrics.warnings_unmatched(),
            ));
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
        pb.finish_and_clear();
    });

    let run_result = run_pipeline(&settings, &metrics, &run_context.warnings_path());

    progress_running.store(false, Ordering::Relaxed);
    let _ = progress_handle.join();

    // Generate report (even on error)
    let (status, files, outcome) = match run_result {
        Ok(files) => {
            let failed = files
                .iter()
                .filter(|f| matches!(f.status, RunStatus::Error { .. }))
                .count();
            if failed > 0 {
                let message = format!("{} file(s) failed out of {}", failed, files.len());
                (
                    RunStatus::Error {
                        message: message.clone(),
                    },
                    files,
                    Err(anyhow!(message)),
                )
            } else {
                (RunStatus::Success, files, Ok(()))
            }
        }
        Err(e) => (
            RunStatus::Error {
                message: format!("{:#}", e),
            },
            Vec::new(),
            Err(e),
        ),
    };

    let report = RunReport::generate(
        &run_context,
        &metrics,
        &settings.reference.organism,
        &settings.import.samples,
        files,
        status,
    );
    match report.save_yaml(&run_context.report_path()) {
        Ok(()) => log::info!("Report saved to {}", run_context.report_path().display()),
        Err(e) => log::error!("Failed to save report: {:#}", e),
    }

    metrics.print_summary();

    if let Err(e) = cleanup_old_runs(&settings.runs.runs_dir, settings.runs.keep_runs) {
        log::warn!("Failed to cleanup old runs: {:#}", e);
    }

    outcome
}

/// Loads the reference once, then maps every input file. Per-file failures are
/// recorded in the returned summaries; only setup failures abort the run.
fn run_pipeline(
    settings: &Settings,
    metrics: &Metrics,
    warnings_path: &Path,
) -> Result<Vec<FileSummary>> {
    let organism = settings.organism()?;
    let pattern = &settings.import.modification_pattern;
    let tag_pattern =
        Regex::new(pattern).with_context(|| format!("Invalid modification_pattern {pattern:?}"))?;

    let store = LocalReferenceStore::new(&settings.storage.reference_dir)
        .with_buffer_size(settings.performance.buffer_size);
    let context = store
        .load_context(organism)
        .with_context(|| format!("Failed to load reference data for {organism}"))?;
    log::info!(
        "Loaded {} proteins and {} annotations for {}",
        context.sequences.len(),
        context.annotations.len(),
        organism
    );

    let input_path = settings.input_path()?;
    let jobs: Vec<(PathBuf, PathBuf)> = if input_path.is_dir() {
        let output_dir = &settings.storage.output_path;
        fs::create_dir_all(output_dir)?;
        let files = collect_input_files(input_path)?;
        log::info!("Directory mode: found {} result files", files.len());
        files
            .into_iter()
            .map(|input| derive_output_path(&input, output_dir).map(|output| (input, output)))
            .collect::<Result<_>>()?
    } else {
        vec![(input_path.to_path_buf(), settings.storage.output_path.clone())]
    };

    let shared = SharedState {
        settings,
        reference: &context,
        tag_pattern: &tag_pattern,
        metrics,
    };
    let outcomes: Vec<(FileSummary, Vec<PipelineWarning>)> = jobs
        .par_iter()
        .map(|(input, output)| process_single_file(input, output, &shared))
        .collect();

    write_warnings(warnings_path, &outcomes)?;

    Ok(outcomes.into_iter().map(|(summary, _)| summary).collect())
}

/// Read-only state shared by every worker.
struct SharedState<'a> {
    settings: &'a Settings,
    reference: &'a ReferenceContext,
    tag_pattern: &'a Regex,
    metrics: &'a Metrics,
}

/// Runs one file through the pipeline and its own writer thread, isolated from
/// every other file.
fn process_single_file(
    input: &Path,
    output: &Path,
    shared: &SharedState<'_>,
) -> (FileSummary, Vec<PipelineWarning>) {
    log::info!("Processing: {} -> {}", input.display(), output.display());

    let metrics = shared.metrics;
    let mut local = LocalMetrics::new();
    let mut format = None;
    let result = map_file(input, output, shared, &mut local, &mut format);

    // One atomic op per counter
    local.merge_into(metrics);

    let (status, written, warnings) = match result {
        Ok(warnings) => {
            metrics.inc_files_processed();
            (RunStatus::Success, Some(output.to_path_buf()), warnings)
        }
        Err(e) => {
            log::error!("Failed to process {}: {:#}", input.display(), e);
            metrics.inc_files_failed();
            let message = format!("{:#}", e);
            (RunStatus::Error { message }, None, Vec::new())
        }
    };

    let summary = FileSummary {
        input: input.to_path_buf(),
        output: written,
        format,
        rows_imported: local.rows_imported(),
        rows_positioned: local.rows_positioned(),
        warnings: local.warnings(),
        status,
    };
    (summary, warnings)
}

/// Maps one file and writes its Parquet output. `format` is set as soon as the
/// file is recognized so failed files still report it.
fn map_file(
    input: &Path,
    output: &Path,
    shared: &SharedState<'_>,
    local: &mut LocalMetrics,
    format: &mut Option<String>,
) -> Result<Vec<PipelineWarning>> {
    let SharedState {
        settings,
        reference,
        tag_pattern,
        metrics,
    } = *shared;

    let size = check_file_size(input, settings.max_file_size_bytes())?;
    local.add_bytes_read(size);
    let detected = detect_format(input)?;
    *format = Some(detected.to_string());

    let (records, warnings) = process_file_as(
        detected,
        input,
        settings.sample_filter(),
        reference,
        tag_pattern,
        settings.performance.buffer_size,
        local,
    )?
    .into_parts();

    // Bounded channel for this file
    let (tx, rx) = bounded(settings.performance.channel_capacity);

    let output_owned = output.to_path_buf();
    let writer_metrics = metrics.clone();
    let writer_settings = settings.clone();
    let writer_handle =
        thread::spawn(move || write_batches(rx, &output_owned, &writer_metrics, &writer_settings));

    let source_file = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    // send_all consumes the batcher and its sender, so the writer always sees
    // a closed channel before the join
    let batch_result =
        Batcher::with_batch_size(tx, metrics.clone(), settings.performance.batch_size)
            .with_source_file(source_file)
            .send_all(&records);

    let writer_result = writer_handle
        .join()
        .map_err(|_| anyhow!("Writer thread panicked"))?;

    // A writer failure closes the channel, so report it before the send error
    writer_result?;
    batch_result?;

    Ok(warnings)
}

fn collect_input_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in INPUT_PATTERNS {
        let pattern = input_dir.join(pattern).to_string_lossy().to_string();
        for entry in glob(&pattern)? {
            match entry {
                Ok(path) => files.push(path),
                Err(e) => log::warn!("Failed to read glob entry: {}", e),
            }
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(anyhow!(
            "No result files found in directory: {}",
            input_dir.display()
        ));
    }
    Ok(files)
}

/// `<output_dir>/<stem>.parquet`, with `.gz` and the table extension stripped.
fn derive_output_path(input_path: &Path, output_dir: &Path) -> Result<PathBuf> {
    let file_name = input_path
        .file_name()
        .ok_or_else(|| anyhow!("Input path has no filename: {}", input_path.display()))?
        .to_string_lossy();

    let stem = file_name.strip_suffix(".gz").unwrap_or(&file_name);
    let stem = [".csv", ".tsv", ".txt"]
        .iter()
        .find_map(|ext| stem.strip_suffix(ext))
        .unwrap_or(stem);

    Ok(output_dir.join(format!("{}.parquet", stem)))
}

/// Tab-separated table of every dropped row across all files.
fn write_warnings(path: &Path, outcomes: &[(FileSummary, Vec<PipelineWarning>)]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create warnings table {}", path.display()))?;
    writer.write_record(["source_file", "kind", "accession", "message"])?;

    for (summary, warnings) in outcomes {
        let source = summary.input.to_string_lossy().into_owned();
        for warning in warnings {
            let message = warning.to_string();
            writer.write_record([source.as_str(), warning.kind(), warning.accession(), message.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}
