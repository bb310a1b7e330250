//! Place-name record (§3): gazetteer candidates ranked by source-scale priority.

use crate::model::{Coordinate, Tags};

/// Per-scale priority scores, larger tier = coarser scale (§GLOSSARY).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScaleScores {
    pub t250: u32,
    pub t100: u32,
    pub t50: u32,
    pub t10: u32,
}

#[derive(Clone, Debug)]
pub struct PlaceName {
    pub reference_id: String,
    /// `Sjö`, `Del av vatten`, `Vattendrag`, `Terräng`, `Glaciär`, `Sankmark`,
    /// `Fors`, `Vattenfall`, …
    pub category: String,
    pub candidates: Vec<Coordinate>,
    pub scores: ScaleScores,
    /// `name`, `name:sv`, `name:fi`, … plus `ref:lantmateriet:ortnamn`.
    pub tags: Tags,
    pub claimed: bool,
}

/// Which scale a candidate's own best (coarsest nonzero) tally comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleTier {
    T250,
    T100,
    T50,
    T10,
}

impl PlaceName {
    /// The coarsest scale at which this candidate has a nonzero tally, i.e.
    /// its own best scale tier, independent of how it compares to any other
    /// candidate (§4.J "too many candidates").
    pub fn best_tier(&self) -> Option<ScaleTier> {
        if self.scores.t250 > 0 {
            Some(ScaleTier::T250)
        } else if self.scores.t100 > 0 {
            Some(ScaleTier::T100)
        } else if self.scores.t50 > 0 {
            Some(ScaleTier::T50)
        } else if self.scores.t10 > 0 {
            Some(ScaleTier::T10)
        } else {
            None
        }
    }

    pub fn name(&self) -> &str {
        self.tags.get("name").map(String::as_str).unwrap_or("")
    }

    pub fn word_count(&self) -> usize {
        self.name().split_whitespace().count()
    }

    /// Numeric form of the reference id for the `-reference_id` tiebreak; a
    /// non-numeric id sorts after every numeric one.
    fn reference_id_numeric(&self) -> i64 {
        self.reference_id.parse().unwrap_or(i64::MIN)
    }

    /// Lexicographic rank key `(T250, T100, T50, T10, word_count, -reference_id)`
    /// (§4.J "Score").
    pub fn rank_key(&self) -> (u32, u32, u32, u32, usize, i64) {
        (
            self.scores.t250,
            self.scores.t100,
            self.scores.t50,
            self.scores.t10,
            self.word_count(),
            -self.reference_id_numeric(),
        )
    }

    /// Distinct from `rank_key`: decides ties for the "Choose name" vs "Verify
    /// name" FIXME split (§4.J). Walks T250 -> T10 and stops at the first tier
    /// either place has; `self` wins only if it's strictly greater there.
    /// Ignores `word_count`/`reference_id` entirely, so two places with equal
    /// scores up to that tier are a tie even if their reference ids differ.
    pub fn priority_name(&self, other: &PlaceName) -> bool {
        let tiers = [
            (self.scores.t250, other.scores.t250),
            (self.scores.t100, other.scores.t100),
            (self.scores.t50, other.scores.t50),
            (self.scores.t10, other.scores.t10),
        ];
        for (mine, theirs) in tiers {
            if mine == 0 && theirs == 0 {
                continue;
            }
            return mine > theirs;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(name: &str, t50: u32, t10: u32, reference_id: &str) -> PlaceName {
        let mut tags = Tags::new();
        tags.insert("name".into(), name.into());
        PlaceName {
            reference_id: reference_id.into(),
            category: "Sjö".into(),
            candidates: vec![],
            scores: ScaleScores { t250: 0, t100: 0, t50, t10 },
            tags,
            claimed: false,
        }
    }

    #[test]
    fn rank_key_prefers_coarser_scale_first() {
        let a = place("Alpha", 3, 1, "1");
        let b = place("Beta", 2, 4, "2");
        assert!(a.rank_key() > b.rank_key());
    }

    #[test]
    fn priority_name_is_a_tie_when_scores_match_up_to_the_shared_tier() {
        let a = place("Alpha", 2, 1, "100");
        let b = place("Beta", 2, 9, "200");
        assert!(!a.priority_name(&b));
        assert!(!b.priority_name(&a));
    }

    #[test]
    fn priority_name_picks_the_strictly_greater_tier() {
        let a = place("Alpha", 3, 1, "1");
        let b = place("Beta", 2, 9, "2");
        assert!(a.priority_name(&b));
        assert!(!b.priority_name(&a));
    }

    #[test]
    fn best_tier_is_the_coarsest_nonzero_scale() {
        let mut p = place("Gamma", 0, 5, "1");
        assert_eq!(p.best_tier(), Some(ScaleTier::T10));
        p.scores.t50 = 2;
        assert_eq!(p.best_tier(), Some(ScaleTier::T50));
        assert_eq!(PlaceName { scores: ScaleScores::default(), ..p }.best_tier(), None);
    }
}
