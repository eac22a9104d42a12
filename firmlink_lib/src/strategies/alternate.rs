use super::{candidate, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// An entity alternate name equals one of the firm's names.
pub struct AlternateNameStrategy;

impl MatchStrategy for AlternateNameStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::AlternateName
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        let mut out = Vec::new();
        for firm in candidates {
            let hit = entity
                .alternates
                .iter()
                .filter(|alt| alt.chars().count() >= ctx.config.min_name_len)
                .find(|alt| firm.names.contains(*alt));
            if let Some(alt) = hit {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::AlternateName,
                    1.0,
                    ctx.config.confidences.alternate_name,
                    [EvidenceFlag::AlternateName],
                    alt,
                ));
            }
        }
        out
    }
}
