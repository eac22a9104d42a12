use std::collections::BTreeSet;

use super::{candidate, char_len, MatchContext, MatchStrategy};
use crate::prepare::{PreparedEntity, PreparedFirm};
use crate::types::{CandidateMatch, EvidenceFlag, Strategy};

/// String similarity above a strict threshold.
///
/// Similarity is the larger of Jaro-Winkler on the normalized names and
/// normalized Levenshtein on their sorted tokens, so reordered names still
/// score. Names carrying different numbers ("3m" vs "4m", "21st" vs "20th")
/// are never fuzzy matches. Confidence scales linearly from `fuzzy_min` at
/// the threshold to `fuzzy_max` at identity. Candidates from this strategy
/// also need validator corroboration before they are accepted.
pub struct FuzzyStrategy;

fn digit_tokens(name: &str) -> BTreeSet<&str> {
    name.split(' ')
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .collect()
}

fn sorted_tokens(name: &str) -> String {
    let mut tokens: Vec<&str> = name.split(' ').filter(|t| !t.is_empty()).collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Combined similarity of two normalized names.
pub fn similarity(a: &str, b: &str) -> f64 {
    let jw = strsim::jaro_winkler(a, b);
    let sorted = strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b));
    jw.max(sorted)
}

impl MatchStrategy for FuzzyStrategy {
    fn strategy(&self) -> Strategy {
        Strategy::Fuzzy
    }

    fn propose(
        &self,
        ctx: &MatchContext<'_>,
        entity: &PreparedEntity,
        candidates: &[&PreparedFirm],
    ) -> Vec<CandidateMatch> {
        let matching = &ctx.config.matching;
        let confidences = &ctx.config.confidences;
        let lexicon = ctx.normalizer.lexicon();
        if char_len(&entity.name) < matching.fuzzy_min_len || lexicon.is_all_generic(&entity.name) {
            return Vec::new();
        }
        let entity_digits = digit_tokens(&entity.name);

        let mut out = Vec::new();
        for firm in candidates {
            let mut best: Option<(f64, &str)> = None;
            for firm_name in &firm.names {
                if *firm_name == entity.name
                    || char_len(firm_name) < matching.fuzzy_min_len
                    || lexicon.is_all_generic(firm_name)
                    || digit_tokens(firm_name) != entity_digits
                {
                    continue;
                }
                let score = similarity(&entity.name, firm_name);
                if score >= matching.fuzzy_threshold && best.map_or(true, |(s, _)| score > s) {
                    best = Some((score, firm_name.as_str()));
                }
            }

            if let Some((score, firm_name)) = best {
                let span = 1.0 - matching.fuzzy_threshold;
                let t = if span > 0.0 {
                    ((score - matching.fuzzy_threshold) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let confidence =
                    confidences.fuzzy_min + t * (confidences.fuzzy_max - confidences.fuzzy_min);
                out.push(candidate(
                    entity,
                    firm,
                    Strategy::Fuzzy,
                    score,
                    confidence,
                    [EvidenceFlag::FuzzyName],
                    firm_name,
                ));
            }
        }
        out
    }
}
