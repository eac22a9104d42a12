use super::{candidate, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// Normalized display name equals a normalized firm legal name or variant.
pub struct ExactNameStrategy;

impl MatchStrategy for ExactNameStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::ExactName
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        if entity.name.is_empty() {
            return Vec::new();
        }
        candidates
            .iter()
            .filter(|firm| firm.names.iter().any(|n| *n == entity.name))
            .map(|firm| {
                candidate(
                    entity,
                    firm,
                    Strategy::ExactName,
                    1.0,
                    ctx.config.confidences.exact_name,
                    [EvidenceFlag::ExactName],
                    &entity.name,
                )
            })
            .collect()
    }
}
