//! Matcher strategies.
//!
//! Every strategy implements [`MatchStrategy`] and sees the same inputs: one
//! prepared entity and its blocked candidate firms. Strategies are pure and
//! independent of one another, so any of them can be exercised alone against
//! a hand-built candidate list. [`default_strategies`] is the single ordered
//! registry the pipeline runs.

mod alternate;
mod exact;
mod fuzzy;
mod homepage;
mod parent_cascade;
mod subsidiary;
mod substring;
mod ticker;
mod ultra_clean;

use std::collections::{BTreeSet, HashMap};

pub use alternate::AlternateNameStrategy;
pub use exact::ExactNameStrategy;
pub use fuzzy::FuzzyStrategy;
pub use homepage::HomepageDomainStrategy;
pub use parent_cascade::ParentCascadeStrategy;
pub use subsidiary::SubsidiaryStrategy;
pub use substring::SubstringStrategy;
pub use ticker::TickerAcronymStrategy;
pub use ultra_clean::UltraCleanStrategy;

use crate::blocking::FirmIndex;
use crate::config::MatchConfig;
use crate::normalize::Normalizer;
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, FinalMatch, Strategy};

/// Read-only state shared by all strategies during a run.
pub struct MatchContext<'a> {
    pub config: &'a MatchConfig,
    pub normalizer: &'a Normalizer,
    pub index: &'a FirmIndex,
    /// Authoritative matches of entities resolved in earlier hierarchy levels.
    pub resolved: &'a HashMap<String, FinalMatch>,
}

/// One independent matching algorithm.
pub trait MatchStrategy: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Propose at most one candidate per firm. An empty result means no
    /// qualifying firm, never an error.
    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch>;
}

/// All strategies in precedence order.
pub fn default_strategies() -> Vec<Box<dyn MatchStrategy>> {
    vec![
        Box::new(ExactNameStrategy),
        Box::new(TickerAcronymStrategy),
        Box::new(HomepageDomainStrategy),
        Box::new(AlternateNameStrategy),
        Box::new(SubstringStrategy),
        Box::new(SubsidiaryStrategy),
        Box::new(UltraCleanStrategy),
        Box::new(FuzzyStrategy),
        Box::new(ParentCascadeStrategy),
    ]
}

pub(crate) fn candidate(
    entity: &PreparedEntity,
    firm: &PreparedFirm,
    strategy: Strategy,
    raw_score: f64,
    confidence: f64,
    evidence: impl IntoIterator<Item = EvidenceFlag>,
    matched_name: &str,
) -> CandidateMatch {
    CandidateMatch {
        entity_id: entity.id().to_string(),
        firm_id: firm.id().to_string(),
        strategy,
        raw_score,
        evidence: evidence.into_iter().collect::<BTreeSet<_>>(),
        confidence,
        matched_name: matched_name.to_string(),
    }
}

/// Best Jaro-Winkler similarity between any entity name and any firm name.
pub(crate) fn best_name_similarity(entity: &PreparedEntity, firm: &PreparedFirm) -> f64 {
    let mut best = 0.0_f64;
    for a in entity.all_names() {
        for b in &firm.names {
            best = best.max(strsim::jaro_winkler(a, b));
        }
    }
    best
}

pub(crate) fn countries_agree(entity: &PreparedEntity, firm: &PreparedFirm) -> bool {
    matches!((&entity.country, &firm.country), (Some(a), Some(b)) if a == b)
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::lexicon::Lexicon;
    use crate::types::{Entity, Firm};

    pub struct Fixture {
        pub config: MatchConfig,
        pub normalizer: Normalizer,
        pub index: FirmIndex,
        pub resolved: HashMap<String, FinalMatch>,
    }

    impl Fixture {
        pub fn new(firms: Vec<Firm>) -> Self {
            Self::with_config(firms, MatchConfig::default())
        }

        pub fn with_config(firms: Vec<Firm>, config: MatchConfig) -> Self {
            let normalizer = Normalizer::new(Lexicon::embedded().unwrap());
            let index = FirmIndex::build(firms, &normalizer, &config).unwrap();
            Self {
                config,
                normalizer,
                index,
                resolved: HashMap::new(),
            }
        }

        pub fn ctx(&self) -> MatchContext<'_> {
            MatchContext {
                config: &self.config,
                normalizer: &self.normalizer,
                index: &self.index,
                resolved: &self.resolved,
            }
        }

        pub fn entity(&self, entity: Entity) -> PreparedEntity {
            PreparedEntity::new(entity, &self.normalizer, &self.config)
        }

        pub fn named(&self, name: &str) -> PreparedEntity {
            self.entity(Entity {
                id: "E1".into(),
                display_name: name.into(),
                ..Default::default()
            })
        }

        /// Every indexed firm, bypassing blocking.
        pub fn all_firms(&self) -> Vec<&PreparedFirm> {
            (0..self.index.len()).map(|i| self.index.firm(i)).collect()
        }

        pub fn run(&self, strategy: &dyn MatchStrategy, entity: &PreparedEntity) -> Vec<CandidateMatch> {
            let firms = self.all_firms();
            strategy.propose(&self.ctx(), entity, &firms)
        }
    }

    pub fn firm(id: &str, legal_name: &str) -> Firm {
        Firm {
            id: id.into(),
            legal_name: legal_name.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_in_precedence_order() {
        let order: Vec<Strategy> = default_strategies().iter().map(|s| s.strategy()).collect();
        assert_eq!(order, Strategy::ALL.to_vec());
    }
}
