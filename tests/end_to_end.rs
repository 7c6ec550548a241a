use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;

use arrow::array::{Array, Int32Array, ListArray, StringArray};
use crossbeam_channel::bounded;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use pepmap::config::Settings;
use pepmap::error::{PipelineError, Result};
use pepmap::metrics::{LocalMetrics, Metrics};
use pepmap::pipeline::batcher::Batcher;
use pepmap::import::SourceFormat;
use pepmap::pipeline::{process_file, process_file_as, PipelineWarning};
use pepmap::reader::check_file_size;
use pepmap::reference::{LocalReferenceStore, Organism, ReferenceContext, ReferenceProvider};
use pepmap::sequence::default_tag_pattern;
use pepmap::view::ProteinView;
use pepmap::writer::parquet::write_batches;

const FASTA: &str = "\
>sp|Q00001|TEST1_HUMAN First test protein OS=Homo sapiens OX=9606 GN=TST1 PE=1 SV=1
MKWVTFISLLLLFSSAYSRGVSRRDTHKSEIAHRFKDLGE
>sp|Q00002|TEST2_HUMAN Second test protein OS=Homo sapiens OX=9606 PE=2 SV=1
MDEKPEPTIDERANGEKATRATVIEWERGG
";

const ANNOTATIONS: &str = "\
protein_id,feature,isoform_id,start,end,note
Q00001,CHAIN,,1,40,First test protein
Q00001,HELIX,,2,10,
Q00001,MOD_RES,,29,,Phosphoserine
Q00002,DOMAIN,,1,30,Kinase
";

const REPORT: &str = "\
Run\tProtein.Ids\tModified.Sequence
run_a\tQ00001\t(UniMod:1)MKWVTFISLLLLFSSAYSR
run_a\tQ00001;Q00002\tDTHKS(UniMod:21)EIAHR
run_b\tP99999\tPEPTIDE
run_b\tQ00001;Q00002\tDTHKS(UniMod:21)EIAHR
";

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("reference")).unwrap();
    fs::write(dir.join("reference/human.fasta"), FASTA).unwrap();
    fs::write(dir.join("reference/preprocessed_uniprot_human.csv"), ANNOTATIONS).unwrap();
    fs::write(dir.join("report.tsv"), REPORT).unwrap();
    dir
}

fn load_reference(dir: &Path) -> Result<ReferenceContext> {
    LocalReferenceStore::new(dir.join("reference")).load_context(Organism::Human)
}

#[test]
fn maps_report_to_parquet() -> Result<()> {
    let dir = workspace("pepmap_end_to_end_parquet");
    let context = load_reference(&dir)?;
    let input = dir.join("report.tsv");
    let output = dir.join("out/report.parquet");

    let mut local = LocalMetrics::new();
    let (records, warnings) =
        process_file(&input, None::<String>, &context, default_tag_pattern(), &mut local)?
            .into_parts();

    assert_eq!(local.rows_imported(), 3);
    assert_eq!(local.rows_expanded(), 4);
    assert_eq!(local.rows_positioned(), 2);
    assert_eq!(
        warnings,
        vec![
            PipelineWarning::SequenceNotMatched {
                sequence: "DTHKSEIAHR".into(),
                accession: "Q00002".into(),
            },
            PipelineWarning::NoReferenceEntry {
                accession: "P99999".into(),
            },
        ]
    );

    let metrics = Metrics::new();
    local.merge_into(&metrics);
    assert_eq!(metrics.warnings_unmatched(), 1);
    assert_eq!(metrics.warnings_no_entry(), 1);

    let settings = Settings::default();
    let (tx, rx) = bounded(settings.performance.channel_capacity);
    let writer_metrics = metrics.clone();
    let writer_output = output.clone();
    let writer = thread::spawn(move || {
        write_batches(rx, &writer_output, &writer_metrics, &Settings::default())
    });

    let mut batcher = Batcher::with_batch_size(tx, metrics.clone(), 1).with_source_file("report.tsv");
    for record in &records {
        batcher.add_record(record)?;
    }
    batcher.finish()?;
    let written = writer.join().unwrap().unwrap();
    assert_eq!(written, 2);

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&output)?)
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.collect::<std::result::Result<_, _>>().unwrap();
    assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);

    let first = &batches[0];
    let column = |name: &str| first.column(first.schema().index_of(name).unwrap()).clone();

    let proteins = column("unique_protein_id");
    let proteins = proteins.as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(proteins.value(0), "Q00001");

    let modified = column("modified_sequence");
    let modified = modified.as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(modified.value(0), "[Acetyl (N-term)]MKWVTFISLLLLFSSAYSR");

    let start = column("start");
    let start = start.as_any().downcast_ref::<Int32Array>().unwrap();
    let end = column("end");
    let end = end.as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!((start.value(0), end.value(0)), (1, 19));

    let sites = column("ptm_sites");
    let sites = sites.as_any().downcast_ref::<ListArray>().unwrap();
    let sites = sites.value(0);
    let sites = sites.as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(sites.values().to_vec(), vec![0]);

    let source = column("source_file");
    let source = source.as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(source.value(0), "report.tsv");

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn sample_filter_restricts_rows() -> Result<()> {
    let dir = workspace("pepmap_end_to_end_samples");
    let context = load_reference(&dir)?;

    let mut local = LocalMetrics::new();
    let result = process_file(
        &dir.join("report.tsv"),
        "run_b",
        &context,
        default_tag_pattern(),
        &mut local,
    )?;
    assert_eq!(local.rows_imported(), 2);
    assert_eq!(result.value.len(), 1);
    assert_eq!((result.value[0].start, result.value[0].end), (25, 34));
    assert_eq!(result.value[0].ptm_sites, vec![4]);
    assert_eq!(result.value[0].protein_sites().collect::<Vec<_>>(), vec![29]);

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn known_format_maps_like_detected_format() -> Result<()> {
    let dir = workspace("pepmap_end_to_end_known_format");
    let context = load_reference(&dir)?;
    let input = dir.join("report.tsv");

    let mut detected_metrics = LocalMetrics::new();
    let detected = process_file(
        &input,
        None::<String>,
        &context,
        default_tag_pattern(),
        &mut detected_metrics,
    )?;

    let mut known_metrics = LocalMetrics::new();
    let known = process_file_as(
        SourceFormat::DiaNn,
        &input,
        None::<String>,
        &context,
        default_tag_pattern(),
        8,
        &mut known_metrics,
    )?;

    assert_eq!(known.value, detected.value);
    assert_eq!(known.warnings, detected.warnings);
    assert_eq!(known_metrics.rows_imported(), detected_metrics.rows_imported());
    assert_eq!(known_metrics.rows_positioned(), 2);

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn protein_view_combines_reference_and_peptides() -> Result<()> {
    let dir = workspace("pepmap_end_to_end_view");
    let context = load_reference(&dir)?;

    let mut local = LocalMetrics::new();
    let records = process_file(
        &dir.join("report.tsv"),
        None::<String>,
        &context,
        default_tag_pattern(),
        &mut local,
    )?
    .value;

    let view = ProteinView::build(
        "Q00001",
        &records,
        &context,
        &["Modified residue", "Secondary structure"],
        &["trypsin", "lysc"],
    )?;

    assert_eq!(view.metadata.label(), "TST1 (Q00001)");
    assert_eq!(view.peptides.len(), 2);
    assert_eq!(view.overlaps.len(), 4);
    assert_eq!(view.features.len(), 2);
    assert_eq!(view.features[0].annotation, "Helix");
    assert_eq!(view.features[1].annotation, "Phosphoserine");
    assert_eq!(view.cleavage_sites["trypsin"], vec![1, 18, 22, 23, 27, 33, 35]);
    assert_eq!(view.cleavage_sites["lysc"], vec![1, 27, 35]);
    assert!((view.coverage - 29.0 / 40.0).abs() < 1e-9);

    let _ = fs::remove_dir_all(dir);
    Ok(())
}

#[test]
fn oversized_input_is_rejected() {
    let dir = workspace("pepmap_end_to_end_size");
    let err = check_file_size(&dir.join("report.tsv"), 16).unwrap_err();
    assert!(matches!(err, PipelineError::FileTooLarge { .. }));

    let err = check_file_size(&dir.join("missing.tsv"), 16).unwrap_err();
    assert!(matches!(err, PipelineError::FileNotFound { .. }));

    let _ = fs::remove_dir_all(dir);
}
