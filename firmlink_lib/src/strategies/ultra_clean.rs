use super::{candidate, char_len, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// Names equal once all separators are removed ("alcatel lucent" and
/// "alcatellucent"), where the spaced forms differ.
pub struct UltraCleanStrategy;

impl MatchStrategy for UltraCleanStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::UltraClean
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
                .all_names()
                .zip(std::iter::once(&entity.ultra).chain(entity.alternate_ultras.iter()))
                .filter(|(_, ultra)| char_len(ultra) >= ctx.config.min_name_len)
                .find(|(name, ultra)| firm.ultras.contains(*ultra) && !firm.names.contains(*name));
            if let Some((_, ultra)) = hit {
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::UltraClean,
                    1.0,
                    ctx.config.confidences.ultra_clean,
                    [EvidenceFlag::UltraCleanName],
                    ultra,
                ));
            }
        }
        out
    }
}
