//! Final gate over combined matches.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::lexicon::Lexicon;
use crate::types::{confidence_key, FinalMatch};

/// Why the quality filter removed a match.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    /// Short entity name matched by a collision-prone strategy.
    ShortNameCollision,
    /// Partial name match on a firm name made only of generic words.
    GenericFirmName,
    /// Strategy disabled by calibration feedback.
    DisabledStrategy,
    /// Confidence outside [acceptance floor, 1].
    OutOfRange,
}

impl FilterReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShortNameCollision => "short_name_collision",
            Self::GenericFirmName => "generic_firm_name",
            Self::DisabledStrategy => "disabled_strategy",
            Self::OutOfRange => "out_of_range",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct QualityFilter<'a> {
    config: &'a MatchConfig,
    lexicon: &'a Lexicon,
}

impl<'a> QualityFilter<'a> {
    pub fn new(config: &'a MatchConfig, lexicon: &'a Lexicon) -> Self {
        Self { config, lexicon }
    }

    /// The first rule a match breaks, if any.
    pub fn check(&self, m: &FinalMatch) -> Option<FilterReason> {
        if m.winning_strategy.is_collision_prone()
            && m.entity_normalized_name.chars().count() < self.config.min_name_len
        {
            return Some(FilterReason::ShortNameCollision);
        }
        if m.winning_strategy.matches_on_name_fragment() && self.lexicon.is_all_generic(&m.matched_name) {
            return Some(FilterReason::GenericFirmName);
        }
        if !self.config.is_enabled(m.winning_strategy) {
            return Some(FilterReason::DisabledStrategy);
        }
        let key = confidence_key(m.confidence);
        if key < confidence_key(self.config.acceptance_floor) || key > confidence_key(1.0) {
            return Some(FilterReason::OutOfRange);
        }
        None
    }

    /// Split matches into kept and removed, preserving input order.
    pub fn filter(&self, matches: Vec<FinalMatch>) -> (Vec<FinalMatch>, Vec<(FinalMatch, FilterReason)>) {
        let mut kept = Vec::with_capacity(matches.len());
        let mut removed = Vec::new();
        for m in matches {
            match self.check(&m) {
                None => kept.push(m),
                Some(reason) => {
                    tracing::debug!(
                        "Filtered {} -> {} ({}): {}",
                        m.entity_id,
                        m.firm_id,
                        m.winning_strategy,
                        reason
                    );
                    removed.push((m, reason));
                }
            }
        }
        (kept, removed)
    }
}
