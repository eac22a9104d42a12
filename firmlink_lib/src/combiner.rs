//! Per-entity deduplication of validated candidates.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::types::{confidence_key, CandidateMatch, EvidenceFlag, FinalMatch};

/// The combiner's decision for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub final_match: FinalMatch,
    /// Another firm tied at the winning confidence and lost on tie-breaks.
    pub ambiguous: bool,
}

/// Total order over candidates, best first: confidence, then country
/// agreement, then description overlap, then strategy precedence, then the
/// smaller firm id.
pub fn rank(a: &CandidateMatch, b: &CandidateMatch) -> Ordering {
    confidence_key(b.confidence)
        .cmp(&confidence_key(a.confidence))
        .then_with(|| b.has(EvidenceFlag::CountryMatch).cmp(&a.has(EvidenceFlag::CountryMatch)))
        .then_with(|| {
            b.has(EvidenceFlag::DescriptionOverlap)
                .cmp(&a.has(EvidenceFlag::DescriptionOverlap))
        })
        .then_with(|| b.strategy.precedence().cmp(&a.strategy.precedence()))
        .then_with(|| a.firm_id.cmp(&b.firm_id))
}

/// Pick at most one firm for an entity.
///
/// The winner carries the union of evidence from every surviving candidate
/// that named the same firm.
pub fn combine(entity_normalized_name: &str, mut candidates: Vec<CandidateMatch>) -> Option<Combined> {
    candidates.sort_by(rank);
    let winner = candidates.first()?;

    let evidence: BTreeSet<EvidenceFlag> = candidates
        .iter()
        .filter(|c| c.firm_id == winner.firm_id)
        .flat_map(|c| c.evidence.iter().copied())
        .collect();

    let ambiguous = candidates
        .iter()
        .find(|c| c.firm_id != winner.firm_id)
        .is_some_and(|c| confidence_key(c.confidence) == confidence_key(winner.confidence));
    if ambiguous {
        tracing::debug!(
            "Entity {} tied between firms; resolved to {}",
            winner.entity_id,
            winner.firm_id
        );
    }

    Some(Combined {
        final_match: FinalMatch {
            entity_id: winner.entity_id.clone(),
            firm_id: winner.firm_id.clone(),
            confidence: winner.confidence,
            winning_strategy: winner.strategy,
            evidence_flags: evidence,
            matched_name: winner.matched_name.clone(),
            entity_normalized_name: entity_normalized_name.to_string(),
        },
        ambiguous,
    })
}
