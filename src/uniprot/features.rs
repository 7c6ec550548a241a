use super::FeatureAnnotation;

/// Groups the categories are presented under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureGroup {
    MoleculeProcessing,
    PostTranslationalModification,
    FamilyAndDomain,
    SubcellularLocation,
    Function,
    Sequence,
    Other,
}

/// A selectable UniProt feature category: display name and flat-file key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureCategory {
    pub name: &'static str,
    pub code: &'static str,
    pub group: FeatureGroup,
}

const fn category(name: &'static str, code: &'static str, group: FeatureGroup) -> FeatureCategory {
    FeatureCategory { name, code, group }
}

use FeatureGroup::*;

pub const FEATURE_CATEGORIES: [FeatureCategory; 37] = [
    category("Chain", "CHAIN", MoleculeProcessing),
    category("Initiator methionine", "INIT_MET", MoleculeProcessing),
    category("Peptide", "PEPTIDE", MoleculeProcessing),
    category("Propeptide", "PROPEP", MoleculeProcessing),
    category("Signal peptide", "SIGNAL", MoleculeProcessing),
    category("Transit peptide", "TRANSIT", MoleculeProcessing),
    category("Cross-link", "CROSSLNK", PostTranslationalModification),
    category("Disulfide bond", "DISULFID", PostTranslationalModification),
    category("Glycosylation", "CARBOHYD", PostTranslationalModification),
    category("Lipidation", "LIPID", PostTranslationalModification),
    category("Modified residue", "MOD_RES", PostTranslationalModification),
    category("Coiled coil", "COILED", FamilyAndDomain),
    category("Compositional bias", "COMPBIAS", FamilyAndDomain),
    category("Domain", "DOMAIN", FamilyAndDomain),
    category("Motif", "MOTIF", FamilyAndDomain),
    category("Region", "REGION", FamilyAndDomain),
    category("Repeat", "REPEAT", FamilyAndDomain),
    category("Zinc finger", "ZN_FING", FamilyAndDomain),
    category("Intramembrane", "INTRAMEM", SubcellularLocation),
    category("Topological domain", "TOPO_DOM", SubcellularLocation),
    category("Transmembrane", "TRANSMEM", SubcellularLocation),
    category("Active site", "ACT_SITE", Function),
    category("Binding site", "BINDING", Function),
    category("Calcium binding", "CA_BIND", Function),
    category("DNA binding", "DNA_BIND", Function),
    category("Metal binding", "METAL", Function),
    category("Nucleotide binding", "NP_BIND", Function),
    category("Site", "SITE", Function),
    category("Alternative sequence", "VAR_SEQ", Sequence),
    category("Natural variant", "VARIANT", Sequence),
    category("Non-adjacent residues", "NON_CONS", Sequence),
    category("Non-standard residue", "NON_STD", Sequence),
    category("Non-terminal residue", "NON_TER", Sequence),
    category("Sequence conflict", "CONFLICT", Sequence),
    category("Sequence uncertainty", "UNSURE", Sequence),
    category("Secondary structure", "STRUCTURE", Other),
    category("Mutagenesis", "MUTAGEN", Other),
];

impl FeatureCategory {
    pub fn by_name(name: &str) -> Option<&'static FeatureCategory> {
        FEATURE_CATEGORIES.iter().find(|c| c.name == name)
    }

    pub fn by_code(code: &str) -> Option<&'static FeatureCategory> {
        FEATURE_CATEGORIES.iter().find(|c| c.code == code)
    }

    /// Translates display names to feature codes, skipping unknown names.
    pub fn codes_for<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
        names
            .into_iter()
            .filter_map(|name| {
                let category = Self::by_name(name);
                if category.is_none() {
                    log::warn!("Unknown feature category {name}");
                }
                category.map(|c| c.code)
            })
            .collect()
    }
}

/// A feature ready for display: secondary-structure keys are merged into
/// `STRUCTURE` and every feature carries a non-empty annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedFeature {
    pub protein_id: String,
    pub feature: String,
    pub isoform_id: String,
    pub start: i64,
    pub end: Option<i64>,
    pub annotation: String,
}

fn structure_annotation(code: &str) -> Option<&'static str> {
    match code {
        "HELIX" => Some("Helix"),
        "STRAND" => Some("Beta strand"),
        "TURN" => Some("Turn"),
        _ => None,
    }
}

/// Formats annotations for display, keeping only features whose (merged) code
/// is in `selected_codes`.
pub fn format_features<'a>(
    annotations: impl IntoIterator<Item = &'a FeatureAnnotation>,
    selected_codes: &[&str],
) -> Vec<FormattedFeature> {
    annotations
        .into_iter()
        .filter_map(|annotation| {
            let (feature, annotation_text) = match structure_annotation(&annotation.feature) {
                Some(kind) => ("STRUCTURE".to_string(), kind.to_string()),
                None if !annotation.note.is_empty() => {
                    (annotation.feature.clone(), annotation.note.clone())
                }
                None => {
                    let name = FeatureCategory::by_code(&annotation.feature)
                        .map_or(annotation.feature.as_str(), |c| c.name);
                    (annotation.feature.clone(), name.to_string())
                }
            };

            if !selected_codes.contains(&feature.as_str()) {
                return None;
            }

            Some(FormattedFeature {
                protein_id: annotation.protein_id.clone(),
                feature,
                isoform_id: annotation.isoform_id.clone(),
                start: annotation.start,
                end: annotation.end,
                annotation: annotation_text,
            })
        })
        .collect()
}
