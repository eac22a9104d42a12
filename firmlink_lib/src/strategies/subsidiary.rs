use super::{candidate, char_len, MatchContext, MatchStrategy};
use crate::normalize::ultra_from_normalized;
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// "X Research", "X Labs", "X Technologies": the extracted parent `X` names
/// a firm.
pub struct SubsidiaryStrategy;

impl MatchStrategy for SubsidiaryStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Subsidiary
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        let Some(parent) = entity.subsidiary_parent.as_deref() else {
            return Vec::new();
        };
        if char_len(parent) < ctx.config.min_name_len
            || ctx.normalizer.lexicon().is_all_generic(parent)
        {
            return Vec::new();
        }
        let parent_ultra = ultra_from_normalized(parent);

        candidates
            .iter()
            .filter(|firm| {
                firm.names.iter().any(|n| n == parent) || firm.ultras.contains(&parent_ultra)
            })
            .map(|firm| {
                candidate(
                    entity,
                    firm,
                    Strategy::Subsidiary,
                    1.0,
                    ctx.config.confidences.subsidiary,
                    [EvidenceFlag::SubsidiaryPattern],
                    parent,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::test_support::{firm, Fixture};

    #[test]
    fn test_research_subsidiary_maps_to_parent() {
        let fx = Fixture::new(vec![firm("F1", "Microsoft Corp"), firm("F2", "Micron Technology")]);
        let found = fx.run(&SubsidiaryStrategy, &fx.named("Microsoft Research Asia Labs"));
        assert!(found.is_empty());

        let found = fx.run(&SubsidiaryStrategy, &fx.named("Microsoft Research"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].firm_id, "F1");
        assert_eq!(found[0].confidence, 0.92);
    }

    #[test]
    fn test_labs_abbreviation_and_trailer() {
        let fx = Fixture::new(vec![firm("F1", "Nokia Bell")]);
        let found = fx.run(&SubsidiaryStrategy, &fx.named("Nokia Bell Labs"));
        assert_eq!(found.len(), 1);
        let found = fx.run(&SubsidiaryStrategy, &fx.named("Nokia-Bell Research Center"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_name, "nokia bell");
    }

    #[test]
    fn test_generic_parent_rejected() {
        let fx = Fixture::new(vec![firm("F1", "General Electric")]);
        assert!(fx.run(&SubsidiaryStrategy, &fx.named("General Research")).is_empty());
    }
}
