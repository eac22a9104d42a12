use super::{candidate, char_len, MatchContext, MatchStrategy};
use crate::normalize::{contains_words, ultra_from_normalized};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// A firm name is contained in the entity name, or the reverse.
///
/// Whole-word containment ("google" in "google deepmind") needs
/// `substring_min_word_len` characters; containment inside a word needs
/// `substring_min_len`. The contained string may not be made only of generic
/// terms, and identical names are left to the exact strategy.
pub struct SubstringStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Containment {
    Partial,
    Word,
}

impl MatchStrategy for SubstringStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Substring
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        if char_len(&entity.name) < ctx.config.min_name_len {
            return Vec::new();
        }

        let mut out = Vec::new();
        for firm in candidates {
            let mut best: Option<(Containment, f64, &str)> = None;
            for entity_name in entity.all_names() {
                for firm_name in &firm.names {
                    let Some((kind, ratio)) = containment(ctx, entity_name, firm_name) else {
                        continue;
                    };
                    let better = match best {
                        None => true,
                        Some((k, r, _)) => kind > k || (kind == k && ratio > r),
                    };
                    if better {
                        best = Some((kind, ratio, firm_name.as_str()));
                    }
                }
            }

            if let Some((kind, ratio, firm_name)) = best {
                let (confidence, flag) = match kind {
                    Containment::Word => (
                        ctx.config.confidences.substring_word,
                        EvidenceFlag::SubstringWord,
                    ),
                    Containment::Partial => (
                        ctx.config.confidences.substring_partial,
                        EvidenceFlag::SubstringPartial,
                    ),
                };
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::Substring,
                    ratio,
                    confidence,
                    [flag],
                    firm_name,
                ));
            }
        }
        out
    }
}

/// Classify how one normalized name contains the other, returning the
/// containment kind and the contained/container length ratio.
fn containment(ctx: &MatchContext<'_>, a: &str, b: &str) -> Option<(Containment, f64)> {
    if a == b || a.is_empty() || b.is_empty() {
        return None;
    }
    let (container, contained) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let lexicon = ctx.normalizer.lexicon();
    if lexicon.is_all_generic(contained) {
        return None;
    }
    let matching = &ctx.config.matching;
    let contained_len = char_len(contained);
    let ratio = contained_len as f64 / char_len(container).max(1) as f64;

    if contained_len >= matching.substring_min_word_len && contains_words(container, contained) {
        return Some((Containment::Word, ratio));
    }

    let contained_ultra = ultra_from_normalized(contained);
    if char_len(&contained_ultra) >= matching.substring_min_len
        && ultra_from_normalized(container).contains(&contained_ultra)
    {
        return Some((Containment::Partial, ratio));
    }
    None
}
