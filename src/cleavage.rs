//! Protease cleavage-site prediction.
//!
//! Each protease is a set of motifs over the residues around the scissile
//! bond (P4..P1 | P1'..P2'). A site is reported as the 0-based index of the
//! P1 residue, i.e. the residue N-terminal to the cut.

use crate::error::{PipelineError, Result};
use Residues::{Any, NoneOf, OneOf};

/// Residue class at one motif position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residues {
    Any,
    OneOf(&'static str),
    NoneOf(&'static str),
}

impl Residues {
    fn matches(self, residue: u8) -> bool {
        match self {
            Residues::Any => residue.is_ascii_alphabetic(),
            Residues::OneOf(set) => set.as_bytes().contains(&residue),
            Residues::NoneOf(set) => {
                residue.is_ascii_alphabetic() && !set.as_bytes().contains(&residue)
            }
        }
    }
}

/// One cleavage motif. `preceding` ends at P2, `following` starts at P1'.
#[derive(Debug, Clone, Copy)]
pub struct CleavageRule {
    pub preceding: &'static [Residues],
    pub site: Residues,
    pub following: &'static [Residues],
}

impl CleavageRule {
    fn matches_at(&self, sequence: &[u8], p1: usize) -> bool {
        if p1 < self.preceding.len() || p1 + self.following.len() >= sequence.len() {
            return false;
        }
        if !self.site.matches(sequence[p1]) {
            return false;
        }
        let before = &sequence[p1 - self.preceding.len()..p1];
        let after = &sequence[p1 + 1..p1 + 1 + self.following.len()];
        self.preceding
            .iter()
            .zip(before)
            .chain(self.following.iter().zip(after))
            .all(|(class, &residue)| class.matches(residue))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Protease {
    pub name: &'static str,
    pub rules: &'static [CleavageRule],
}

const fn at(site: Residues) -> CleavageRule {
    CleavageRule {
        preceding: &[],
        site,
        following: &[],
    }
}

const NOT_CASPASE_P1: Residues = NoneOf("PEDQKR");

pub static PROTEASES: &[Protease] = &[
    Protease {
        name: "trypsin",
        rules: &[
            CleavageRule { preceding: &[], site: OneOf("KR"), following: &[NoneOf("P")] },
            CleavageRule { preceding: &[OneOf("W")], site: OneOf("K"), following: &[OneOf("P")] },
            CleavageRule { preceding: &[OneOf("M")], site: OneOf("R"), following: &[OneOf("P")] },
        ],
    },
    Protease { name: "lysc", rules: &[at(OneOf("K"))] },
    Protease {
        name: "lysn",
        rules: &[CleavageRule { preceding: &[], site: Any, following: &[OneOf("K")] }],
    },
    Protease { name: "argc", rules: &[at(OneOf("R"))] },
    Protease {
        name: "aspn",
        rules: &[CleavageRule { preceding: &[], site: Any, following: &[OneOf("D")] }],
    },
    Protease { name: "gluc", rules: &[at(OneOf("E"))] },
    Protease { name: "bnps-skatole", rules: &[at(OneOf("W"))] },
    Protease {
        name: "caspase 1",
        rules: &[CleavageRule {
            preceding: &[OneOf("FWYL"), Any, OneOf("HAT")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 2",
        rules: &[CleavageRule {
            preceding: &[OneOf("D"), OneOf("V"), OneOf("A")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 3",
        rules: &[CleavageRule {
            preceding: &[OneOf("D"), OneOf("M"), OneOf("Q")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 4",
        rules: &[CleavageRule {
            preceding: &[OneOf("L"), OneOf("E"), OneOf("V")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 5",
        rules: &[CleavageRule {
            preceding: &[OneOf("LW"), OneOf("E"), OneOf("H")],
            site: OneOf("D"),
            following: &[],
        }],
    },
    Protease {
        name: "caspase 6",
        rules: &[CleavageRule {
            preceding: &[OneOf("V"), OneOf("E"), OneOf("HI")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 7",
        rules: &[CleavageRule {
            preceding: &[OneOf("D"), OneOf("E"), OneOf("V")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 8",
        rules: &[CleavageRule {
            preceding: &[OneOf("IL"), OneOf("E"), OneOf("T")],
            site: OneOf("D"),
            following: &[NOT_CASPASE_P1],
        }],
    },
    Protease {
        name: "caspase 9",
        rules: &[CleavageRule {
            preceding: &[OneOf("L"), OneOf("E"), OneOf("H")],
            site: OneOf("D"),
            following: &[],
        }],
    },
    Protease {
        name: "caspase 10",
        rules: &[CleavageRule {
            preceding: &[OneOf("I"), OneOf("E"), OneOf("A")],
            site: OneOf("D"),
            following: &[],
        }],
    },
    Protease {
        name: "chymotrypsin high specificity",
        rules: &[
            CleavageRule { preceding: &[], site: OneOf("FY"), following: &[NoneOf("P")] },
            CleavageRule { preceding: &[], site: OneOf("W"), following: &[NoneOf("MP")] },
        ],
    },
    Protease {
        name: "chymotrypsin low specificity",
        rules: &[
            CleavageRule { preceding: &[], site: OneOf("FLY"), following: &[NoneOf("P")] },
            CleavageRule { preceding: &[], site: OneOf("W"), following: &[NoneOf("MP")] },
            CleavageRule { preceding: &[], site: OneOf("M"), following: &[NoneOf("PY")] },
            CleavageRule { preceding: &[], site: OneOf("H"), following: &[NoneOf("DMPW")] },
        ],
    },
    Protease { name: "clostripain", rules: &[at(OneOf("R"))] },
    Protease { name: "cnbr", rules: &[at(OneOf("M"))] },
    Protease {
        name: "enterokinase",
        rules: &[CleavageRule {
            preceding: &[OneOf("DE"), OneOf("DE"), OneOf("DE")],
            site: OneOf("K"),
            following: &[],
        }],
    },
    Protease {
        name: "factor xa",
        rules: &[CleavageRule {
            preceding: &[OneOf("AFGILTVM"), OneOf("DE"), OneOf("G")],
            site: OneOf("R"),
            following: &[],
        }],
    },
    Protease { name: "formic acid", rules: &[at(OneOf("D"))] },
    Protease {
        name: "granzyme b",
        rules: &[CleavageRule {
            preceding: &[OneOf("I"), OneOf("E"), OneOf("P")],
            site: OneOf("D"),
            following: &[],
        }],
    },
    Protease {
        name: "hydroxylamine",
        rules: &[CleavageRule { preceding: &[], site: OneOf("N"), following: &[OneOf("G")] }],
    },
    Protease { name: "iodosobenzoic acid", rules: &[at(OneOf("W"))] },
    Protease {
        name: "ntcb",
        rules: &[CleavageRule { preceding: &[], site: Any, following: &[OneOf("C")] }],
    },
    Protease {
        name: "pepsin ph1.3",
        rules: &[
            CleavageRule {
                preceding: &[NoneOf("HKR"), NoneOf("P")],
                site: NoneOf("R"),
                following: &[OneOf("FL"), NoneOf("P")],
            },
            CleavageRule {
                preceding: &[NoneOf("HKR"), NoneOf("P")],
                site: OneOf("FL"),
                following: &[Any, NoneOf("P")],
            },
        ],
    },
    Protease {
        name: "pepsin ph2.0",
        rules: &[
            CleavageRule {
                preceding: &[NoneOf("HKR"), NoneOf("P")],
                site: NoneOf("R"),
                following: &[OneOf("FLWY"), NoneOf("P")],
            },
            CleavageRule {
                preceding: &[NoneOf("HKR"), NoneOf("P")],
                site: OneOf("FLWY"),
                following: &[Any, NoneOf("P")],
            },
        ],
    },
    Protease {
        name: "proline endopeptidase",
        rules: &[CleavageRule {
            preceding: &[OneOf("HKR")],
            site: OneOf("P"),
            following: &[NoneOf("P")],
        }],
    },
    Protease { name: "proteinase k", rules: &[at(OneOf("AEFILTVWY"))] },
    Protease {
        name: "staphylococcal peptidase i",
        rules: &[CleavageRule { preceding: &[NoneOf("E")], site: OneOf("E"), following: &[] }],
    },
    Protease {
        name: "thermolysin",
        rules: &[CleavageRule { preceding: &[], site: NoneOf("DE"), following: &[OneOf("AFILMV")] }],
    },
    Protease {
        name: "thrombin",
        rules: &[
            CleavageRule { preceding: &[OneOf("G")], site: OneOf("R"), following: &[OneOf("G")] },
            CleavageRule {
                preceding: &[OneOf("AFGILTVM"), OneOf("AFGILTVWA"), OneOf("P")],
                site: OneOf("R"),
                following: &[NoneOf("DE"), NoneOf("DE")],
            },
        ],
    },
];

/// Names of all supported proteases, in table order.
pub fn protease_names() -> impl Iterator<Item = &'static str> {
    PROTEASES.iter().map(|p| p.name)
}

pub fn protease(name: &str) -> Result<&'static Protease> {
    PROTEASES
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| PipelineError::UnknownProtease {
            name: name.to_string(),
        })
}

/// Predict cleavage sites of `protease` in `sequence`, ascending and unique.
pub fn get_cleavage_sites(sequence: &str, protease_name: &str) -> Result<Vec<usize>> {
    let protease = protease(protease_name)?;
    let bytes = sequence.as_bytes();

    Ok((0..bytes.len())
        .filter(|&p1| protease.rules.iter().any(|rule| rule.matches_at(bytes, p1)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cleavage_sites() {
        assert_eq!(get_cleavage_sites("PEPTIDERANGEKATRAT", "trypsin").unwrap(), vec![7, 12, 15]);
        assert_eq!(get_cleavage_sites("PEPTIDERANGEKATRAT", "lysc").unwrap(), vec![12]);
        assert!(get_cleavage_sites("PEPTIDERANGEKATRAT", "caspase 2").unwrap().is_empty());
        assert_eq!(get_cleavage_sites("PEPVDVADTIDE", "caspase 2").unwrap(), vec![7]);
    }

    #[test]
    fn trypsin_skips_proline_and_needs_a_following_residue() {
        assert!(get_cleavage_sites("AKPAR", "trypsin").unwrap().is_empty());
        assert_eq!(get_cleavage_sites("AWKPA", "trypsin").unwrap(), vec![2]);
    }

    #[test]
    fn n_terminal_cutters_report_preceding_residue() {
        assert_eq!(get_cleavage_sites("AADAAKA", "aspn").unwrap(), vec![1]);
        assert_eq!(get_cleavage_sites("AADAAKA", "lysn").unwrap(), vec![4]);
        assert!(get_cleavage_sites("DAA", "aspn").unwrap().is_empty());
    }

    #[test]
    fn unknown_protease_is_an_error() {
        let err = get_cleavage_sites("PEPTIDE", "papain").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownProtease { .. }));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = protease_names().collect();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(names.contains(&"caspase 10"));
    }
}
