//! Object-kind polymorphism (§9): a tagged variant for the source's string
//! labels, plus the small satellite tables (`is_avoid`, `is_auxiliary`,
//! `sort_priority`, `default_tags`) that would otherwise be scattered `match`es
//! on raw strings. The tables themselves are configuration data (§1 "out of
//! scope"); only the dispatch shape lives here.

use std::borrow::Cow;

use crate::model::Tags;

/// A source object type, e.g. `Strandlinje, sjö` or `Gridline`. Known kinds that
/// participate in dedicated pipeline logic get a variant; everything else is
/// carried verbatim so unknown kinds still round-trip through ingestion tagging
/// (§7 "Tagging unknown").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    StrandlinjeSjo,
    StrandlinjeHav,
    StangningMotHav,
    Stangning,
    Gridline,
    SankmarkGrans,
    Vattendrag,
    VattendragYta,
    Vattenfall,
    Fors,
    Akvedukt,
    Sjo,
    AnlagtVatten,
    Hav,
    DelAvVatten,
    Glaciar,
    Sankmark,
    Terrang,
    Bebyggelse,
    Ortnamn,
    Island,
    Other(Box<str>),
}

impl ObjectKind {
    pub fn from_source(label: &str) -> Self {
        match label {
            "Strandlinje, sjö" => ObjectKind::StrandlinjeSjo,
            "Strandlinje, hav" => ObjectKind::StrandlinjeHav,
            "Stängning mot hav" => ObjectKind::StangningMotHav,
            "Stängning" => ObjectKind::Stangning,
            "Gridline" => ObjectKind::Gridline,
            "Sankmark gräns" => ObjectKind::SankmarkGrans,
            "Vattendrag" => ObjectKind::Vattendrag,
            "Vattendragsyta" => ObjectKind::VattendragYta,
            "Vattenfall" => ObjectKind::Vattenfall,
            "Fors" => ObjectKind::Fors,
            "Akvedukt" => ObjectKind::Akvedukt,
            "Sjö" => ObjectKind::Sjo,
            "Anlagt vatten" => ObjectKind::AnlagtVatten,
            "Hav" => ObjectKind::Hav,
            "Del av vatten" => ObjectKind::DelAvVatten,
            "Glaciär" => ObjectKind::Glaciar,
            "Sankmark" => ObjectKind::Sankmark,
            "Terräng" => ObjectKind::Terrang,
            "Bebyggelse" => ObjectKind::Bebyggelse,
            "Ortnamn" => ObjectKind::Ortnamn,
            "Ö" => ObjectKind::Island,
            other => ObjectKind::Other(other.into()),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            ObjectKind::StrandlinjeSjo => "Strandlinje, sjö".into(),
            ObjectKind::StrandlinjeHav => "Strandlinje, hav".into(),
            ObjectKind::StangningMotHav => "Stängning mot hav".into(),
            ObjectKind::Stangning => "Stängning".into(),
            ObjectKind::Gridline => "Gridline".into(),
            ObjectKind::SankmarkGrans => "Sankmark gräns".into(),
            ObjectKind::Vattendrag => "Vattendrag".into(),
            ObjectKind::VattendragYta => "Vattendragsyta".into(),
            ObjectKind::Vattenfall => "Vattenfall".into(),
            ObjectKind::Fors => "Fors".into(),
            ObjectKind::Akvedukt => "Akvedukt".into(),
            ObjectKind::Sjo => "Sjö".into(),
            ObjectKind::AnlagtVatten => "Anlagt vatten".into(),
            ObjectKind::Hav => "Hav".into(),
            ObjectKind::DelAvVatten => "Del av vatten".into(),
            ObjectKind::Glaciar => "Glaciär".into(),
            ObjectKind::Sankmark => "Sankmark".into(),
            ObjectKind::Terrang => "Terräng".into(),
            ObjectKind::Bebyggelse => "Bebyggelse".into(),
            ObjectKind::Ortnamn => "Ortnamn".into(),
            ObjectKind::Island => "Ö".into(),
            ObjectKind::Other(s) => Cow::Owned(s.to_string()),
        }
    }

    /// Objects in the *avoid* set are discarded entirely during ingestion (§4.C).
    pub fn is_avoid(&self) -> bool {
        matches!(self.as_str().as_ref(), "Triangelpunkt" | "Fixpunkt" | "Geodetisk punkt")
    }

    /// Objects in the *auxiliary* set become `used = 0` segments rather than
    /// features (§4.C): shore lines, grid lines, settlement boundaries, etc.
    pub fn is_auxiliary(&self) -> bool {
        matches!(
            self,
            ObjectKind::StrandlinjeSjo
                | ObjectKind::StrandlinjeHav
                | ObjectKind::StangningMotHav
                | ObjectKind::Stangning
                | ObjectKind::Gridline
                | ObjectKind::SankmarkGrans
        ) || matches!(self.as_str().as_ref(), "Bebyggelse gräns" | "Kvartersmark gräns")
    }

    /// `*gräns` wetland boundary segments, optionally widened to any `*gräns`
    /// kind when `merge_wetland` is enabled (§4.E preamble).
    pub fn is_wetland_boundary(&self, merge_wetland: bool) -> bool {
        match self {
            ObjectKind::StrandlinjeSjo | ObjectKind::StrandlinjeHav | ObjectKind::SankmarkGrans => true,
            ObjectKind::Other(s) => merge_wetland && s.ends_with("gräns"),
            _ => false,
        }
    }

    /// Water features: shoreline segments on these orient with water on the right.
    pub fn is_water(&self) -> bool {
        matches!(self, ObjectKind::Sjo | ObjectKind::AnlagtVatten | ObjectKind::VattendragYta | ObjectKind::Hav)
    }

    pub fn is_wetland(&self) -> bool {
        matches!(self, ObjectKind::Sankmark)
            || matches!(self.as_str().as_ref(), "Myr" | "Kärr" | "Mosse")
    }

    pub fn is_woodland(&self) -> bool {
        matches!(self.as_str().as_ref(), "Skogsmark" | "Lövskog" | "Barrskog" | "Blandskog")
    }

    /// Priority order used for decomposition/combination passes (§4.G): sea first,
    /// then lake/pond/river-surface, glacier, settlement, farmland, wetlands,
    /// woodlands, everything else last. Lower value sorts first.
    pub fn sort_priority(&self) -> u32 {
        match self {
            ObjectKind::Hav => 0,
            ObjectKind::Sjo | ObjectKind::AnlagtVatten | ObjectKind::VattendragYta => 10,
            ObjectKind::Glaciar => 20,
            ObjectKind::Bebyggelse => 30,
            _ if matches!(self.as_str().as_ref(), "Åker" | "Fruktodling") => 40,
            _ if self.is_wetland() => 50,
            _ if self.is_woodland() => 60,
            _ => 100,
        }
    }

    /// Default OSM tags for a kind that needs no further per-feature logic.
    /// Kind-specific composition (protected-area names, waterway class,
    /// lake/reservoir elevation, aerodrome/airstrip) lives in `ingestion::tag_feature`.
    pub fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        match self {
            ObjectKind::Sjo => {
                tags.insert("natural".into(), "water".into());
                tags.insert("water".into(), "lake".into());
            }
            ObjectKind::AnlagtVatten => {
                tags.insert("natural".into(), "water".into());
                tags.insert("water".into(), "pond".into());
            }
            ObjectKind::Hav => {
                tags.insert("natural".into(), "water".into());
                tags.insert("water".into(), "sea".into());
            }
            ObjectKind::VattendragYta => {
                tags.insert("natural".into(), "water".into());
                tags.insert("water".into(), "river".into());
            }
            ObjectKind::Glaciar => {
                tags.insert("natural".into(), "glacier".into());
            }
            ObjectKind::Sankmark => {
                tags.insert("natural".into(), "wetland".into());
            }
            ObjectKind::Island => {
                tags.insert("place".into(), "island".into());
            }
            _ => {}
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_kinds() {
        for label in ["Strandlinje, sjö", "Gridline", "Vattendrag", "Sjö"] {
            let kind = ObjectKind::from_source(label);
            assert_eq!(kind.as_str(), label);
        }
    }

    #[test]
    fn unknown_kind_is_preserved_verbatim() {
        let kind = ObjectKind::from_source("Okänd typ");
        assert_eq!(kind.as_str(), "Okänd typ");
        assert!(!kind.is_auxiliary());
    }

    #[test]
    fn auxiliary_kinds_are_not_features() {
        assert!(ObjectKind::Gridline.is_auxiliary());
        assert!(ObjectKind::StrandlinjeSjo.is_auxiliary());
        assert!(!ObjectKind::Sjo.is_auxiliary());
    }
}
