use super::{candidate, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// A child entity inherits its resolved parent's firm at a discount.
///
/// Only parents resolved in an earlier hierarchy level are visible, so the
/// inherited match is always the parent's final, filtered one.
pub struct ParentCascadeStrategy;

impl MatchStrategy for ParentCascadeStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::ParentCascade
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        _candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        let Some(parent_id) = entity.entity.parent_id.as_deref() else {
            return Vec::new();
        };
        let Some(parent_match) = ctx.resolved.get(parent_id) else {
            return Vec::new();
        };
        let Some(firm) = ctx.index.firm_by_id(&parent_match.firm_id) else {
            return Vec::new();
        };
        let confidence = parent_match.confidence * ctx.config.confidences.cascade_discount;
        vec![candidate(
            entity,
            firm,
            Strategy::ParentCascade,
            parent_match.confidence,
            confidence,
            [EvidenceFlag::ParentCascade],
            &parent_match.matched_name,
        )]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::strategies::test_support::{firm, Fixture};
    use crate::types::{Entity, FinalMatch};

    fn parent_match() -> FinalMatch {
        FinalMatch {
            entity_id: "P1".into(),
            firm_id: "F1".into(),
            confidence: 0.99,
            winning_strategy: Strategy::ExactName,
            evidence_flags: BTreeSet::from([EvidenceFlag::ExactName]),
            matched_name: "acme".into(),
            entity_normalized_name: "acme".into(),
        }
    }

    #[test]
    fn test_child_inherits_discounted_match() {
        let mut fx = Fixture::new(vec![firm("F1", "Acme Corp")]);
        fx.resolved.insert("P1".into(), parent_match());
        let child = fx.entity(Entity {
            id: "C1".into(),
            display_name: "Zurich Lab".into(),
            parent_id: Some("P1".into()),
            ..Default::default()
        });
        let found = fx.run(&ParentCascadeStrategy, &child);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].firm_id, "F1");
        assert!((found[0].confidence - 0.9405).abs() < 1e-9);
    }

    #[test]
    fn test_unresolved_parent_yields_nothing() {
        let fx = Fixture::new(vec![firm("F1", "Acme Corp")]);
        let child = fx.entity(Entity {
            id: "C1".into(),
            display_name: "Zurich Lab".into(),
            parent_id: Some("P1".into()),
            ..Default::default()
        });
        assert!(fx.run(&ParentCascadeStrategy, &child).is_empty());
    }
}
