use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::Registry;
use crate::error::TaxaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Domain,
    Kingdom,
    Subkingdom,
    Superphylum,
    Phylum,
    Subphylum,
    Superclass,
    Class,
    Subclass,
    Infraclass,
    Superorder,
    Order,
    Suborder,
    Infraorder,
    Superfamily,
    Family,
    Subfamily,
    Tribe,
    Subtribe,
    Genus,
    Subgenus,
    Section,
    Series,
    InfragenericName,
    Species,
    InfraspecificName,
    Subspecies,
    Variety,
    Subvariety,
    Form,
    Subform,
    Cultivar,
    Strain,
    Unranked,
}

const GBIF_MARKERS: &[(Rank, &str)] = &[
    (Rank::Domain, "DOMAIN"),
    (Rank::Kingdom, "KINGDOM"),
    (Rank::Subkingdom, "SUBKINGDOM"),
    (Rank::Superphylum, "SUPERPHYLUM"),
    (Rank::Phylum, "PHYLUM"),
    (Rank::Subphylum, "SUBPHYLUM"),
    (Rank::Superclass, "SUPERCLASS"),
    (Rank::Class, "CLASS"),
    (Rank::Subclass, "SUBCLASS"),
    (Rank::Infraclass, "INFRACLASS"),
    (Rank::Superorder, "SUPERORDER"),
    (Rank::Order, "ORDER"),
    (Rank::Suborder, "SUBORDER"),
    (Rank::Infraorder, "INFRAORDER"),
    (Rank::Superfamily, "SUPERFAMILY"),
    (Rank::Family, "FAMILY"),
    (Rank::Subfamily, "SUBFAMILY"),
    (Rank::Tribe, "TRIBE"),
    (Rank::Subtribe, "SUBTRIBE"),
    (Rank::Genus, "GENUS"),
    (Rank::Subgenus, "SUBGENUS"),
    (Rank::Section, "SECTION"),
    (Rank::Series, "SERIES"),
    (Rank::InfragenericName, "INFRAGENERIC_NAME"),
    (Rank::Species, "SPECIES"),
    (Rank::InfraspecificName, "INFRASPECIFIC_NAME"),
    (Rank::Subspecies, "SUBSPECIES"),
    (Rank::Variety, "VARIETY"),
    (Rank::Subvariety, "SUBVARIETY"),
    (Rank::Form, "FORM"),
    (Rank::Subform, "SUBFORM"),
    (Rank::Cultivar, "CULTIVAR"),
    (Rank::Strain, "STRAIN"),
    (Rank::Unranked, "UNRANKED"),
];

// First entry per rank is the canonical uBio spelling; later entries are accepted aliases.
const UBIO_MARKERS: &[(Rank, &str)] = &[
    (Rank::Domain, "domain"),
    (Rank::Domain, "superkingdom"),
    (Rank::Kingdom, "kingdom"),
    (Rank::Kingdom, "regnum"),
    (Rank::Subkingdom, "subkingdom"),
    (Rank::Superphylum, "superphylum"),
    (Rank::Phylum, "phylum"),
    (Rank::Phylum, "division"),
    (Rank::Subphylum, "subphylum"),
    (Rank::Subphylum, "subdivision"),
    (Rank::Superclass, "superclass"),
    (Rank::Class, "class"),
    (Rank::Class, "classis"),
    (Rank::Subclass, "subclass"),
    (Rank::Infraclass, "infraclass"),
    (Rank::Superorder, "superorder"),
    (Rank::Order, "order"),
    (Rank::Order, "ordo"),
    (Rank::Suborder, "suborder"),
    (Rank::Infraorder, "infraorder"),
    (Rank::Superfamily, "superfamily"),
    (Rank::Family, "family"),
    (Rank::Family, "familia"),
    (Rank::Subfamily, "subfamily"),
    (Rank::Tribe, "tribe"),
    (Rank::Subtribe, "subtribe"),
    (Rank::Genus, "genus"),
    (Rank::Subgenus, "subgenus"),
    (Rank::Section, "section"),
    (Rank::Section, "sect."),
    (Rank::Series, "series"),
    (Rank::Series, "ser."),
    (Rank::Species, "species"),
    (Rank::Species, "sp."),
    (Rank::Subspecies, "subspecies"),
    (Rank::Subspecies, "subsp."),
    (Rank::Subspecies, "ssp."),
    (Rank::Variety, "variety"),
    (Rank::Variety, "var."),
    (Rank::Subvariety, "subvariety"),
    (Rank::Subvariety, "subvar."),
    (Rank::Form, "forma"),
    (Rank::Form, "f."),
    (Rank::Form, "form"),
    (Rank::Subform, "subforma"),
    (Rank::Subform, "subf."),
    (Rank::Cultivar, "cultivar"),
    (Rank::Cultivar, "cv."),
    (Rank::Strain, "strain"),
    (Rank::Unranked, "no rank"),
];

impl Rank {
    fn ordinal(self) -> Option<usize> {
        match self {
            Rank::Unranked => None,
            ranked => Some(ranked as usize),
        }
    }

    pub fn is_unranked(self) -> bool {
        matches!(self, Rank::Unranked)
    }

    pub fn from_marker(registry: Registry, marker: &str) -> Rank {
        match registry {
            Registry::Gbif => Self::from_gbif(marker),
            Registry::Ubio => Self::from_ubio(marker),
        }
    }

    pub fn from_gbif(marker: &str) -> Rank {
        let normalized = marker.trim().to_ascii_uppercase().replace(' ', "_");
        GBIF_MARKERS
            .iter()
            .find(|(_, value)| *value == normalized)
            .map(|(rank, _)| *rank)
            .unwrap_or(Rank::Unranked)
    }

    pub fn to_gbif(self) -> &'static str {
        GBIF_MARKERS
            .iter()
            .find(|(rank, _)| *rank == self)
            .map(|(_, value)| *value)
            .unwrap_or("UNRANKED")
    }

    pub fn from_ubio(marker: &str) -> Rank {
        let normalized = marker.trim().to_lowercase();
        UBIO_MARKERS
            .iter()
            .find(|(_, value)| *value == normalized)
            .map(|(rank, _)| *rank)
            .unwrap_or(Rank::Unranked)
    }

    pub fn to_ubio(self) -> &'static str {
        UBIO_MARKERS
            .iter()
            .find(|(rank, _)| *rank == self)
            .map(|(_, value)| *value)
            .unwrap_or("no rank")
    }

    /// False if either side is unranked.
    pub fn is_higher_than(self, other: Rank) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    pub fn is_lower_or_unspecified(self, other: Rank) -> bool {
        match (self.ordinal(), other.ordinal()) {
            (Some(a), Some(b)) => a > b,
            _ => true,
        }
    }

    pub fn is_equal_lower_or_unspecified(self, other: Rank) -> bool {
        self == other || self.is_lower_or_unspecified(other)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_gbif().to_ascii_lowercase())
    }
}

impl FromStr for Rank {
    type Err = TaxaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let gbif = Rank::from_gbif(value);
        if !gbif.is_unranked() {
            return Ok(gbif);
        }
        let ubio = Rank::from_ubio(value);
        if !ubio.is_unranked() {
            return Ok(ubio);
        }
        let normalized = value.trim().to_ascii_lowercase();
        if normalized == "unranked" || normalized == "no rank" {
            return Ok(Rank::Unranked);
        }
        Err(TaxaError::InvalidRank(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn gbif_round_trip_covers_every_rank() {
        for (rank, marker) in GBIF_MARKERS {
            assert_eq!(Rank::from_gbif(marker), *rank);
            assert_eq!(rank.to_gbif(), *marker);
        }
    }

    #[test]
    fn unknown_markers_are_unranked() {
        assert_eq!(Rank::from_gbif("CHEMOFORM"), Rank::Unranked);
        assert_eq!(Rank::from_ubio("morph"), Rank::Unranked);
    }

    #[test]
    fn ubio_abbreviations() {
        assert_eq!(Rank::from_ubio("var."), Rank::Variety);
        assert_eq!(Rank::from_ubio("Subsp."), Rank::Subspecies);
        assert_eq!(Rank::Form.to_ubio(), "forma");
        assert_eq!(Rank::from_marker(Registry::Ubio, "familia"), Rank::Family);
    }

    #[test]
    fn partial_order() {
        assert!(Rank::Species.is_lower_or_unspecified(Rank::Genus));
        assert!(!Rank::Genus.is_lower_or_unspecified(Rank::Species));
        assert!(!Rank::Genus.is_lower_or_unspecified(Rank::Genus));
        assert!(Rank::Genus.is_equal_lower_or_unspecified(Rank::Genus));
        assert!(Rank::Unranked.is_lower_or_unspecified(Rank::Species));
        assert!(Rank::Kingdom.is_lower_or_unspecified(Rank::Unranked));
        assert!(Rank::Order.is_higher_than(Rank::Family));
        assert!(!Rank::Unranked.is_higher_than(Rank::Family));
    }

    #[test]
    fn strict_parse() {
        assert_eq!("species".parse::<Rank>().unwrap(), Rank::Species);
        assert_eq!("var.".parse::<Rank>().unwrap(), Rank::Variety);
        assert_matches!("banana".parse::<Rank>(), Err(TaxaError::InvalidRank(_)));
    }
}
