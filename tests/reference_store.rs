use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use pepmap::error::{PipelineError, Result};
use pepmap::reference::{LocalReferenceStore, Organism, ReferenceProvider};
use pepmap::uniprot::{format_features, read_annotations, write_annotations, FeatureCategory};

const FLAT_FILE: &str = "\
ID   TEST1_HUMAN             Reviewed;          40 AA.
AC   Q00001;
FT   SIGNAL          1..18
FT   MOD_RES         22
FT                   /note=\"Phosphoserine; by
FT                   CK2\"
FT   STRAND          25..30
SQ   SEQUENCE   40 AA;
//
ID   TEST2_HUMAN             Reviewed;          30 AA.
AC   Q00002; Q00099;
FT   DOMAIN          <1..>30
FT                   /note=\"Kinase\"
FT                   /evidence=\"ECO:0000255\"
SQ   SEQUENCE   30 AA;
//
";

const FASTA: &str = "\
>sp|Q00001|TEST1_HUMAN First test protein OS=Homo sapiens OX=9606 GN=TST1 PE=1 SV=1
MKWVTFISLLLLFSSAYSRGVSRRDTHKSEIAHRFKDLGE
>sp|Q00002|TEST2_HUMAN Second test protein OS=Homo sapiens OX=9606 PE=2 SV=1
MDEKPEPTIDERANGEKATRATVIEWERGG
";

fn reference_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_gz(path: &Path, contents: &str) {
    let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::default());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

#[test]
fn falls_back_to_gzipped_flat_file() -> Result<()> {
    let dir = reference_dir("pepmap_reference_flat");
    fs::write(dir.join("human.fasta"), FASTA).unwrap();
    write_gz(&dir.join("human.txt.gz"), FLAT_FILE);

    let context = LocalReferenceStore::new(&dir).load_context(Organism::Human)?;
    assert_eq!(context.sequences.len(), 2);
    assert_eq!(
        context.sequences.get("Q00001").and_then(|e| e.description.gene.as_deref()),
        Some("TST1")
    );

    let rows = &context.annotations;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].note, "Phosphoserine; by CK2");
    assert_eq!((rows[1].start, rows[1].end), (22, None));
    assert_eq!(rows[3].protein_id, "Q00002");
    assert_eq!((rows[3].start, rows[3].end), (1, Some(30)));

    let modified = FeatureCategory::codes_for(["Modified residue", "Secondary structure"]);
    let formatted = format_features(context.annotations_for("Q00001"), &modified);
    assert_eq!(formatted.len(), 2);
    assert_eq!(formatted[1].feature, "STRUCTURE");
    assert_eq!(formatted[1].annotation, "Beta strand");
    Ok(())
}

#[test]
fn preprocessed_table_is_preferred() -> Result<()> {
    let dir = reference_dir("pepmap_reference_table");
    fs::write(dir.join("mouse.fasta"), FASTA).unwrap();
    fs::write(dir.join("mouse.txt"), "this is not read\n").unwrap();

    let flat = dir.join("flat.txt");
    fs::write(&flat, FLAT_FILE).unwrap();
    let annotations = pepmap::uniprot::preprocess_uniprot(&flat)?;
    write_annotations(&dir.join("preprocessed_uniprot_mouse.csv"), &annotations)?;

    let store = LocalReferenceStore::new(&dir);
    let loaded = store.get_annotations(Organism::Mouse)?;
    assert_eq!(loaded, annotations);
    Ok(())
}

#[test]
fn float_formatted_coordinates_are_accepted() -> Result<()> {
    let dir = reference_dir("pepmap_reference_floats");
    let path = dir.join("annotations.csv");
    fs::write(
        &path,
        "protein_id,feature,isoform_id,start,end,note\n\
         Q00001,CHAIN,,1.0,40.0,Test chain\n\
         Q00001,MOD_RES,,22.0,,Phosphoserine\n",
    )
    .unwrap();

    let rows = read_annotations(&path)?;
    assert_eq!((rows[0].start, rows[0].end), (1, Some(40)));
    assert_eq!((rows[1].start, rows[1].end), (22, None));
    Ok(())
}

#[test]
fn missing_reference_files_are_reported() {
    let dir = reference_dir("pepmap_reference_empty");
    let err = LocalReferenceStore::new(&dir)
        .get_sequences(Organism::Rat)
        .unwrap_err();
    assert!(matches!(err, PipelineError::FileNotFound { .. }));

    let err = LocalReferenceStore::new(&dir)
        .get_annotations(Organism::Rat)
        .unwrap_err();
    assert!(matches!(err, PipelineError::FileNotFound { .. }));
}
